use serde::Serialize;

use crate::ast::{BinaryOperator, SourceSpan};
use crate::types::Type;

pub const FULL_CONFIDENCE: u8 = 100;
const ANY_CONFIDENCE: u8 = 50;
const UNKNOWN_CONFIDENCE: u8 = 25;
/// `+` on strings or untyped values may mean concatenation or addition.
const AMBIGUOUS_PLUS_CONFIDENCE: u8 = 70;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceResult {
    #[serde(rename = "type")]
    pub ty: Type,
    /// 0 to 100.
    pub confidence: u8,
    pub ambiguous: bool,
    pub span: SourceSpan,
}

/// Advisory record of how sure the checker is about each inferred type.
/// Nothing here changes whether a program type checks.
#[derive(Debug, Default, Clone)]
pub struct InferenceEngine {
    results: Vec<InferenceResult>,
}

impl InferenceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &[InferenceResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<InferenceResult> {
        self.results
    }

    pub fn ambiguous(&self) -> impl Iterator<Item = &InferenceResult> {
        self.results.iter().filter(|result| result.ambiguous)
    }

    pub fn record_binary(
        &mut self,
        operator: BinaryOperator,
        left: &Type,
        right: &Type,
        result: &Type,
        span: SourceSpan,
    ) -> &InferenceResult {
        let is_stringish = |ty: &Type| matches!(ty, Type::String | Type::Any);
        let (confidence, ambiguous) =
            if operator == BinaryOperator::Add && is_stringish(left) && is_stringish(right) {
                (AMBIGUOUS_PLUS_CONFIDENCE, true)
            } else {
                let operands = confidence_of(left).min(confidence_of(right));
                (operands.min(confidence_of(result)), false)
            };

        self.push(result.clone(), confidence, ambiguous, span)
    }

    pub fn record_declaration(&mut self, ty: &Type, span: SourceSpan) -> &InferenceResult {
        self.push(ty.clone(), confidence_of(ty), false, span)
    }

    fn push(
        &mut self,
        ty: Type,
        confidence: u8,
        ambiguous: bool,
        span: SourceSpan,
    ) -> &InferenceResult {
        self.results.push(InferenceResult {
            ty,
            confidence,
            ambiguous,
            span,
        });
        &self.results[self.results.len() - 1]
    }
}

/// Base confidence for a type, looking through containers for the least
/// certain component.
pub fn confidence_of(ty: &Type) -> u8 {
    match ty {
        Type::Error => 0,
        Type::Unknown => UNKNOWN_CONFIDENCE,
        Type::Any => ANY_CONFIDENCE,
        Type::Array(Some(element)) | Type::Set(element) | Type::Optional(element) => {
            confidence_of(element)
        }
        Type::HashMap(key, value) => confidence_of(key).min(confidence_of(value)),
        Type::Union(members) => members
            .iter()
            .map(confidence_of)
            .min()
            .unwrap_or(FULL_CONFIDENCE),
        _ => FULL_CONFIDENCE,
    }
}
