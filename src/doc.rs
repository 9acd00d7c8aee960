// SPDX: CC0-1.0

use crate::{
    expr::Expr,
    parse::{self, ParseErr},
    registry::FunctionRegistry,
    stdlib::VAR_NAMES,
};
use std::sync::Arc;

/// One plotted formula and the result of parsing its text.
#[derive(Clone, Debug, Default)]
pub struct Formula {
    text: String,
    expr: Option<Arc<Expr>>,
    error: Option<ParseErr>,
}

impl Formula {
    pub fn new(text: impl Into<String>, functions: &FunctionRegistry) -> Self {
        let mut formula = Self {
            text: text.into(),
            ..Self::default()
        };
        formula.reparse(functions);
        formula
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parsed tree, absent when the text is blank or has an error.
    pub fn expr(&self) -> Option<&Arc<Expr>> {
        self.expr.as_ref()
    }

    pub fn error(&self) -> Option<&ParseErr> {
        self.error.as_ref()
    }

    /// Replaces the text and reparses it. Returns whether the expression
    /// changed.
    pub fn set_text(&mut self, text: impl Into<String>, functions: &FunctionRegistry) -> bool {
        let text = text.into();
        if text == self.text {
            return false;
        }
        self.text = text;
        self.reparse(functions)
    }

    /// Parses the text again, e.g. after the user functions changed.
    ///
    /// The stored tree is only replaced by one that is not equivalent to it,
    /// so edits that only touch whitespace leave the expression as is.
    /// Returns whether the expression changed.
    pub fn reparse(&mut self, functions: &FunctionRegistry) -> bool {
        let parsed = if self.text.trim().is_empty() {
            Ok(None)
        } else {
            parse::parse_expression(&self.text, functions, VAR_NAMES).map(Some)
        };
        let expr = match parsed {
            Ok(expr) => {
                self.error = None;
                expr
            }
            Err(err) => {
                self.error = Some(err);
                None
            }
        };

        let changed = match (&self.expr, &expr) {
            (Some(old), Some(new)) => !old.is_equivalent(new),
            (None, None) => false,
            _ => true,
        };
        if changed {
            self.expr = expr;
        }
        changed
    }
}

/// An error as listed to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorItem {
    pub heading: String,
    pub message: String,
}

/// The user's function block and formulas.
#[derive(Debug, Default)]
pub struct Document {
    functions_text: String,
    functions: FunctionRegistry,
    function_errors: Vec<ParseErr>,
    formulas: Vec<Formula>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn functions_text(&self) -> &str {
        &self.functions_text
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    pub fn function_errors(&self) -> &[ParseErr] {
        &self.function_errors
    }

    pub fn formulas(&self) -> &[Formula] {
        &self.formulas
    }

    /// Replaces the function block, then reparses every formula against the
    /// new functions. Returns whether any formula's expression changed.
    pub fn set_functions_text(&mut self, text: impl Into<String>) -> bool {
        self.functions_text = text.into();
        let mut functions = FunctionRegistry::new();
        self.function_errors = parse::parse_function_defs(&self.functions_text, &mut functions);
        self.functions = functions;
        tracing::debug!(
            functions = self.functions.len(),
            errors = self.function_errors.len(),
            "function block updated"
        );

        let mut changed = false;
        for formula in &mut self.formulas {
            changed |= formula.reparse(&self.functions);
        }
        changed
    }

    /// Appends a formula and returns its index.
    pub fn add_formula(&mut self, text: impl Into<String>) -> usize {
        self.formulas.push(Formula::new(text, &self.functions));
        self.formulas.len() - 1
    }

    /// Returns whether the expression changed, or `None` if there is no
    /// formula at `idx`.
    pub fn set_formula(&mut self, idx: usize, text: impl Into<String>) -> Option<bool> {
        let formula = self.formulas.get_mut(idx)?;
        let changed = formula.set_text(text, &self.functions);
        tracing::trace!(idx, changed, "formula edited");
        Some(changed)
    }

    pub fn remove_formula(&mut self, idx: usize) -> Option<Formula> {
        (idx < self.formulas.len()).then(|| self.formulas.remove(idx))
    }

    /// Errors of the function block followed by those of the formulas.
    pub fn errors(&self) -> Vec<ErrorItem> {
        let functions = self.function_errors.iter().map(|err| ErrorItem {
            heading: if err.function.is_empty() {
                "Error in user defined function".to_string()
            } else {
                format!("Error in function: {}", err.function)
            },
            message: format!("Error: {err}"),
        });
        let formulas = self.formulas.iter().enumerate().filter_map(|(idx, formula)| {
            let err = formula.error()?;
            Some(ErrorItem {
                heading: format!("Error in formula {}", idx + 1),
                message: format!("Error: column {}: {}", err.column, err.message),
            })
        });
        functions.chain(formulas).collect()
    }
}
