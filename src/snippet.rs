//! C-like snippet generators.
//!
//! The generators assume a [`Vocabulary`] that passed [`Vocabulary::validate`].
//! Given an unvalidated one they still return text: an inverted range yields its
//! `min`, an empty list yields an empty token, and the function part count is
//! clamped to `1..=4`. `typist::run` and `typist::plan_session` validate first.

use anyhow::{ensure, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Kinds of code-like fragments the generator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnippetKind {
    VariableDeclaration,
    Conditional,
    CountedLoop,
    ConditionalLoop,
    StructDefinition,
    FunctionDefinition,
}

impl SnippetKind {
    pub const ALL: [SnippetKind; 6] = [
        SnippetKind::VariableDeclaration,
        SnippetKind::Conditional,
        SnippetKind::CountedLoop,
        SnippetKind::ConditionalLoop,
        SnippetKind::StructDefinition,
        SnippetKind::FunctionDefinition,
    ];

    /// Kinds allowed inside a function body.
    pub const SIMPLE: [SnippetKind; 4] = [
        SnippetKind::VariableDeclaration,
        SnippetKind::Conditional,
        SnippetKind::CountedLoop,
        SnippetKind::ConditionalLoop,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SnippetKind::VariableDeclaration => "variable",
            SnippetKind::Conditional => "if/else",
            SnippetKind::CountedLoop => "for loop",
            SnippetKind::ConditionalLoop => "while loop",
            SnippetKind::StructDefinition => "struct",
            SnippetKind::FunctionDefinition => "function",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    pub kind: SnippetKind,
    pub text: String,
    /// Nested snippets in the order they were chosen (function bodies only).
    pub parts: Vec<Snippet>,
}

impl Snippet {
    fn leaf(kind: SnippetKind, text: String) -> Self {
        Self {
            kind,
            text,
            parts: Vec::new(),
        }
    }
}

/// Inclusive integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub min: u32,
    pub max: u32,
}

impl IntRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Uniform in `min..=max`; `min` when the range is empty or inverted.
    pub fn sample(&self, rng: &mut impl Rng) -> u32 {
        if self.min >= self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub types: Vec<String>,
    pub operators: Vec<String>,
    pub loop_vars: Vec<String>,
    pub name_suffix: IntRange,
    pub declaration_value: IntRange,
    pub condition_operand: IntRange,
    pub for_limit: IntRange,
    pub while_limit: IntRange,
    pub function_parts: IntRange,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            types: strings(&["int", "float", "double", "char"]),
            operators: strings(&["<", ">", "<=", ">=", "==", "!="]),
            loop_vars: strings(&["i", "j", "k"]),
            name_suffix: IntRange::new(1, 999),
            declaration_value: IntRange::new(0, 100),
            condition_operand: IntRange::new(1, 50),
            for_limit: IntRange::new(5, 50),
            while_limit: IntRange::new(5, 30),
            function_parts: IntRange::new(1, 3),
        }
    }
}

impl Vocabulary {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.types.is_empty(), "types must not be empty");
        ensure!(!self.operators.is_empty(), "operators must not be empty");
        ensure!(!self.loop_vars.is_empty(), "loop_vars must not be empty");

        for (name, range) in [
            ("name_suffix", self.name_suffix),
            ("declaration_value", self.declaration_value),
            ("condition_operand", self.condition_operand),
            ("for_limit", self.for_limit),
            ("while_limit", self.while_limit),
            ("function_parts", self.function_parts),
        ] {
            ensure!(
                range.min <= range.max,
                "{name}: min ({}) must be <= max ({})",
                range.min,
                range.max
            );
        }

        let simple = SnippetKind::SIMPLE.len() as u32;
        ensure!(
            self.function_parts.min >= 1 && self.function_parts.max <= simple,
            "function_parts must be within 1..={simple}"
        );

        Ok(())
    }
}

fn pick<'a>(items: &'a [String], rng: &mut impl Rng) -> &'a str {
    items.choose(rng).map(String::as_str).unwrap_or_default()
}

pub fn render_variable_declaration(ty: &str, suffix: u32, value: u32) -> String {
    format!("{ty} var_{suffix} = {value};\n")
}

pub fn render_conditional(a: u32, op: &str, b: u32) -> String {
    format!(
        "\nif ({a} {op} {b}) {{\n    // condition true\n}} else {{\n    // condition false\n}}\n"
    )
}

pub fn render_counted_loop(var: &str, limit: u32) -> String {
    format!("\nfor (int {var} = 0; {var} < {limit}; {var}++) {{\n    // loop body\n}}\n")
}

pub fn render_conditional_loop(limit: u32) -> String {
    format!("\nint counter = 0;\nwhile (counter < {limit}) {{\n    counter++;\n}}\n")
}

pub fn render_struct_definition(suffix: u32, field_ty: &str) -> String {
    format!("\ntypedef struct Struct_{suffix} {{\n    {field_ty} value;\n}} Struct_{suffix};\n")
}

pub fn render_function_definition(suffix: u32, body: &str) -> String {
    format!("\nvoid func_{suffix}() {{\n{body}\n}}\n")
}

pub fn variable_declaration(vocab: &Vocabulary, rng: &mut impl Rng) -> Snippet {
    let suffix = vocab.name_suffix.sample(rng);
    let ty = pick(&vocab.types, rng);
    let value = vocab.declaration_value.sample(rng);
    Snippet::leaf(
        SnippetKind::VariableDeclaration,
        render_variable_declaration(ty, suffix, value),
    )
}

pub fn conditional(vocab: &Vocabulary, rng: &mut impl Rng) -> Snippet {
    let a = vocab.condition_operand.sample(rng);
    let b = vocab.condition_operand.sample(rng);
    let op = pick(&vocab.operators, rng);
    Snippet::leaf(SnippetKind::Conditional, render_conditional(a, op, b))
}

pub fn counted_loop(vocab: &Vocabulary, rng: &mut impl Rng) -> Snippet {
    let var = pick(&vocab.loop_vars, rng);
    let limit = vocab.for_limit.sample(rng);
    Snippet::leaf(SnippetKind::CountedLoop, render_counted_loop(var, limit))
}

pub fn conditional_loop(vocab: &Vocabulary, rng: &mut impl Rng) -> Snippet {
    let limit = vocab.while_limit.sample(rng);
    Snippet::leaf(SnippetKind::ConditionalLoop, render_conditional_loop(limit))
}

pub fn struct_definition(vocab: &Vocabulary, rng: &mut impl Rng) -> Snippet {
    let suffix = vocab.name_suffix.sample(rng);
    let field_ty = pick(&vocab.types, rng);
    Snippet::leaf(
        SnippetKind::StructDefinition,
        render_struct_definition(suffix, field_ty),
    )
}

/// A `void` function wrapping 1..=3 distinct simple constructs.
///
/// Structs and functions are never nested, so recursion stops after one level.
pub fn function_definition(vocab: &Vocabulary, rng: &mut impl Rng) -> Snippet {
    let suffix = vocab.name_suffix.sample(rng);
    let count = (vocab.function_parts.sample(rng) as usize).clamp(1, SnippetKind::SIMPLE.len());

    let kinds: Vec<SnippetKind> = SnippetKind::SIMPLE
        .choose_multiple(rng, count)
        .copied()
        .collect();

    let parts: Vec<Snippet> = kinds
        .into_iter()
        .map(|kind| generate(kind, vocab, rng))
        .collect();

    let body: String = parts.iter().map(|p| p.text.as_str()).collect();

    Snippet {
        kind: SnippetKind::FunctionDefinition,
        text: render_function_definition(suffix, &body),
        parts,
    }
}

pub fn generate(kind: SnippetKind, vocab: &Vocabulary, rng: &mut impl Rng) -> Snippet {
    match kind {
        SnippetKind::VariableDeclaration => variable_declaration(vocab, rng),
        SnippetKind::Conditional => conditional(vocab, rng),
        SnippetKind::CountedLoop => counted_loop(vocab, rng),
        SnippetKind::ConditionalLoop => conditional_loop(vocab, rng),
        SnippetKind::StructDefinition => struct_definition(vocab, rng),
        SnippetKind::FunctionDefinition => function_definition(vocab, rng),
    }
}

pub fn random_kind(rng: &mut impl Rng) -> SnippetKind {
    SnippetKind::ALL[rng.gen_range(0..SnippetKind::ALL.len())]
}

pub fn random_snippet(vocab: &Vocabulary, rng: &mut impl Rng) -> Snippet {
    let kind = random_kind(rng);
    generate(kind, vocab, rng)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_vocabulary_is_valid() {
        Vocabulary::default().validate().expect("defaults should validate");
    }

    #[test]
    fn rejects_inverted_ranges_and_empty_lists() {
        let vocab = Vocabulary {
            for_limit: IntRange::new(50, 5),
            ..Default::default()
        };
        let msg = format!("{:#}", vocab.validate().unwrap_err());
        assert!(msg.contains("for_limit"), "unexpected error: {msg}");

        let vocab = Vocabulary {
            operators: Vec::new(),
            ..Default::default()
        };
        assert!(vocab.validate().is_err());

        let vocab = Vocabulary {
            function_parts: IntRange::new(0, 2),
            ..Default::default()
        };
        assert!(vocab.validate().is_err());
    }

    #[test]
    fn degenerate_range_returns_its_only_value() {
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        assert_eq!(IntRange::new(7, 7).sample(&mut rng), 7);
    }

    #[test]
    fn unvalidated_vocabulary_degrades_without_panicking() {
        let vocab = Vocabulary {
            types: Vec::new(),
            declaration_value: IntRange::new(9, 3),
            function_parts: IntRange::new(6, 6),
            ..Default::default()
        };
        assert!(vocab.validate().is_err());

        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        let decl = variable_declaration(&vocab, &mut rng);
        assert!(decl.text.starts_with(" var_"), "got {:?}", decl.text);
        assert!(decl.text.ends_with(" = 9;\n"), "got {:?}", decl.text);

        let func = function_definition(&vocab, &mut rng);
        assert_eq!(func.parts.len(), SnippetKind::SIMPLE.len());
    }
}
