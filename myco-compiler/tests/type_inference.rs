use std::path::PathBuf;

use myco_compiler::{Lexer, Parser, SourceFile, SourceId, Type, TypeChecker, FULL_CONFIDENCE};

fn check(source: &str) -> TypeChecker {
    let source_file = SourceFile::new(SourceId(0), PathBuf::from("test.myco"), source.to_string());
    let tokens = Lexer::new(&source_file).tokenize().expect("lex source");
    let mut parser = Parser::new(&source_file, tokens);
    let program = parser.parse_program();
    assert_eq!(
        parser.error_record().count,
        0,
        "unexpected syntax errors: {:?}",
        parser.error_record()
    );

    let mut checker = TypeChecker::new();
    let passed = checker.type_check(&program);
    let messages: Vec<_> = checker.errors().iter().map(|d| d.message.clone()).collect();
    assert!(passed, "unexpected type errors: {messages:?}");
    checker
}

fn type_of(checker: &TypeChecker, name: &str) -> Type {
    checker
        .environment()
        .lookup_variable(name)
        .unwrap_or_else(|| panic!("variable {name} is not declared"))
}

#[test]
fn literals_infer_primitive_types() {
    let checker = check(
        "let a = 42;\nlet b = 3.14;\nlet c = \"text\";\nlet d = true;\nlet e = null;\n",
    );
    assert_eq!(type_of(&checker, "a"), Type::Int);
    assert_eq!(type_of(&checker, "b"), Type::Float);
    assert_eq!(type_of(&checker, "c"), Type::String);
    assert_eq!(type_of(&checker, "d"), Type::Bool);
    assert_eq!(type_of(&checker, "e"), Type::Null);
}

#[test]
fn arithmetic_follows_numeric_and_string_rules() {
    let checker = check(
        "let sum = 1 + 2;\nlet mixed = 1 + 2.5;\nlet text = \"n = \" + 1;\nlet quotient = 10 / 4;\nlet power = 2 ** 8;\nlet less = 1 < 2;\n",
    );
    assert_eq!(type_of(&checker, "sum"), Type::Int);
    assert_eq!(type_of(&checker, "mixed"), Type::Float);
    assert_eq!(type_of(&checker, "text"), Type::String);
    assert_eq!(type_of(&checker, "quotient"), Type::Int);
    assert_eq!(type_of(&checker, "power"), Type::Int);
    assert_eq!(type_of(&checker, "less"), Type::Bool);
}

#[test]
fn collection_literals_merge_element_types() {
    let checker = check(
        "let ints = [1, 2, 3];\nlet floats = [1, 2.5];\nlet mixed = [1, \"a\"];\nlet empty = [];\nlet map = {name: \"Rex\", kind: \"dog\"};\nlet set = {1, 2};\nlet nothing = {};\n",
    );
    assert_eq!(type_of(&checker, "ints"), Type::array_of(Type::Int));
    assert_eq!(type_of(&checker, "floats"), Type::array_of(Type::Float));
    assert_eq!(type_of(&checker, "mixed"), Type::Array(None));
    assert_eq!(type_of(&checker, "empty"), Type::Array(None));
    assert_eq!(
        type_of(&checker, "map"),
        Type::HashMap(Box::new(Type::String), Box::new(Type::String))
    );
    assert_eq!(type_of(&checker, "set"), Type::Set(Box::new(Type::Int)));
    assert_eq!(type_of(&checker, "nothing"), Type::Set(Box::new(Type::Any)));
}

#[test]
fn ranges_and_indexing() {
    let checker = check(
        "let r = 1..10;\nlet xs = [1, 2];\nlet first = xs[0];\nlet ages = {rex: 3};\nlet age = ages[\"rex\"];\nlet letter = \"abc\"[0];\n",
    );
    assert_eq!(type_of(&checker, "r"), Type::array_of(Type::Int));
    assert_eq!(type_of(&checker, "first"), Type::Int);
    assert_eq!(type_of(&checker, "age"), Type::Int);
    assert_eq!(type_of(&checker, "letter"), Type::String);
}

#[test]
fn function_calls_use_declared_return_types() {
    let checker = check(
        "let early = add(1, 2);\nfunc add(a: Int, b: Int) -> Int:\n  return a + b;\nend\nlet later = add(3, 4);\n",
    );
    assert_eq!(type_of(&checker, "early"), Type::Int);
    assert_eq!(type_of(&checker, "later"), Type::Int);
    assert_eq!(
        type_of(&checker, "add"),
        Type::Function(vec![Type::Int, Type::Int], Box::new(Type::Int))
    );
}

#[test]
fn lambdas_are_function_typed_values() {
    let checker = check(
        "let double = func(x: Int) -> Int:\n  return x * 2;\nend;\nlet result = double(21);\n",
    );
    assert_eq!(
        type_of(&checker, "double"),
        Type::Function(vec![Type::Int], Box::new(Type::Int))
    );
    assert_eq!(type_of(&checker, "result"), Type::Int);
}

#[test]
fn classes_expose_fields_and_methods() {
    let checker = check(
        "class Dog:\n  let name: String = \"Rex\"\n  func speak() -> String:\n    return \"Woof from \" + self.name;\n  end\nend\nclass Puppy extends Dog:\nend\nlet dog = Dog();\nlet sound = dog.speak();\nlet name = dog.name;\nlet pup: Dog = Puppy();\nlet yip = pup.speak();\nlet inherited = Puppy().name;\n",
    );
    assert_eq!(type_of(&checker, "dog"), Type::Class("Dog".to_string()));
    assert_eq!(type_of(&checker, "sound"), Type::String);
    assert_eq!(type_of(&checker, "name"), Type::String);
    assert_eq!(type_of(&checker, "yip"), Type::String);
    assert_eq!(type_of(&checker, "inherited"), Type::String);
}

#[test]
fn member_heuristics_fill_in_library_calls() {
    let checker = check(
        "let xs = [3, 1, 2];\nlet n = xs.length;\nlet shout = \"hi\".upper();\nlet has = xs.contains(1);\nlet sorted = xs.sort();\nlet odd = xs.frobnicate();\n",
    );
    assert_eq!(type_of(&checker, "n"), Type::Int);
    assert_eq!(type_of(&checker, "shout"), Type::String);
    assert_eq!(type_of(&checker, "has"), Type::Bool);
    assert_eq!(type_of(&checker, "sorted"), Type::Array(None));
    assert_eq!(type_of(&checker, "odd"), Type::Unknown);
}

#[test]
fn unknown_names_are_permissive_and_refined_by_assignment() {
    let checker = check("let z = mystery;\nz = 5;\nuse math;\nlet root = math.sqrt(16);\n");
    assert_eq!(type_of(&checker, "z"), Type::Int);
    assert_eq!(type_of(&checker, "math"), Type::Any);
    assert_eq!(type_of(&checker, "root"), Type::Unknown);
}

#[test]
fn annotations_resolve_to_declared_types() {
    let checker = check(
        "let maybe: Int? = null;\nlet either: Int | String = 1;\nlet scores: HashMap<String, Int> = {alice: 1};\nlet tags: Set<String> = {\"a\"};\nlet grid: [[Int]] = [[1]];\n",
    );
    assert_eq!(type_of(&checker, "maybe"), Type::optional(Type::Int));
    assert_eq!(
        type_of(&checker, "either"),
        Type::Union(vec![Type::Int, Type::String])
    );
    assert_eq!(
        type_of(&checker, "scores"),
        Type::HashMap(Box::new(Type::String), Box::new(Type::Int))
    );
    assert_eq!(type_of(&checker, "tags"), Type::Set(Box::new(Type::String)));
    assert_eq!(
        type_of(&checker, "grid"),
        Type::array_of(Type::array_of(Type::Int))
    );
}

#[test]
fn control_flow_bodies_are_checked_in_their_own_scopes() {
    let checker = check(
        "let total = 0;\nfor i in 1..5:\n  let step = i * 2;\n  total += step;\nend\nwhile total < 100:\n  total = total * 2;\nend\ntry:\n  risky();\ncatch err:\n  print(err);\nend\nmatch total:\n  case n when n > 10 => n;\n  else => 0;\nend\n",
    );
    assert_eq!(type_of(&checker, "total"), Type::Int);
    assert!(checker.environment().lookup_variable("step").is_none());
    assert!(checker.environment().lookup_variable("n").is_none());
    assert_eq!(checker.environment().depth(), 1);
}

#[test]
fn inference_results_score_confidence() {
    let checker = check(
        "func greet(name):\n  return \"Hello, \" + name;\nend\nlet sum = 1 + 2;\n",
    );
    let results = checker.inference().results();

    let ambiguous: Vec<_> = checker.inference().ambiguous().collect();
    assert_eq!(ambiguous.len(), 1);
    assert_eq!(ambiguous[0].confidence, 70);
    assert_eq!(ambiguous[0].ty, Type::String);

    assert!(results
        .iter()
        .any(|result| result.ty == Type::Int && result.confidence == FULL_CONFIDENCE));
}
