// SPDX: CC0-1.0

use crate::{
    lex::{LexErrTyp, Lexer, TokTyp},
    parse::{ParseErr, ParseErrTyp},
    registry::FunctionRegistry,
    stdlib::{self, INTRINSICS},
};
use anyhow::Context;
use core::fmt;
use std::io::{self, stdin, BufRead, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Add,
    Set,
    List,
    Funcs,
    Window,
    Tree,
    Tokens,
    Errors,
    Plot,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::Add,
            Self::Set,
            Self::List,
            Self::Funcs,
            Self::Window,
            Self::Plot,
            Self::Errors,
            Self::Tree,
            Self::Tokens,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command, function and constant",
            Self::Quit => "quit the shell",
            Self::Add => "add a formula to plot",
            Self::Set => "edit a formula (leave blank to remove it)",
            Self::List => "list formulas and user defined functions",
            Self::Funcs => "replace the user defined functions, one per line",
            Self::Window => "set viewport parameters",
            Self::Tree => "print the simplified formulas (for debugging)",
            Self::Tokens => "print the tokens of some text (for debugging)",
            Self::Errors => "list errors in formulas and functions",
            Self::Plot => "plot every formula without errors",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::Add => "add",
            Self::Set => "set",
            Self::List => "list",
            Self::Funcs => "funcs",
            Self::Window => "window",
            Self::Tree => "tree",
            Self::Tokens => "tokens",
            Self::Errors => "errors",
            Self::Plot => "plot",
        }
    }
}

impl core::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for c in Self::exhaustive() {
            if s == c.name() {
                return Ok(*c);
            }
        }
        Err(())
    }
}

pub fn input<W: Write>(out: W, prompt: impl fmt::Display) -> anyhow::Result<String> {
    fn inner<W: Write>(mut out: W, prompt: impl fmt::Display) -> io::Result<String> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut stdin = stdin().lock();
        let mut s = String::new();
        stdin.read_line(&mut s)?;
        Ok(s.trim().to_string())
    }

    let s = inner(out, prompt).context("read from standard input failed")?;
    Ok(s)
}

pub fn read_fromstr<W: Write, T: core::str::FromStr>(
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Result<Option<T>, <T as core::str::FromStr>::Err>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let input = input(&mut out, prompt)?;
    if ignore_empty && input.is_empty() {
        return Ok(Ok(None));
    }
    match input.parse::<T>() {
        Ok(new) => Ok(Ok(Some(new))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &input, 1, input.chars().count())?;
            writeln!(out, "parse error: {err}")?;
            Ok(Err(err))
        }
    }
}

/// Prints `src` and marks `width` characters from the 1-based `column`.
pub fn underline<W: Write>(mut out: W, src: &str, column: usize, width: usize) -> io::Result<()> {
    writeln!(out, "{src}")?;
    writeln!(
        out,
        "{}{}",
        " ".repeat(column.saturating_sub(1)),
        "^".repeat(width.max(1))
    )?;
    Ok(())
}

/// Reports a parse error of `src`, with notes on likely causes.
pub fn explain<W: Write>(
    mut out: W,
    src: &str,
    err: &ParseErr,
    functions: &FunctionRegistry,
) -> io::Result<()> {
    underline(&mut out, src, err.column, 1)?;
    if err.function.is_empty() {
        writeln!(out, "parse error: {}", err.message)?;
    } else {
        writeln!(out, "parse error in {}(): {}", err.function, err.message)?;
    }

    match &err.typ {
        ParseErrTyp::Lex(LexErrTyp::InvalidChar) => {
            let bad = src.chars().nth(err.column.saturating_sub(1));
            if let Some('|') = bad {
                writeln!(out, "note: use the 'abs' function to compute absolute value")?;
            } else {
                writeln!(
                    out,
                    "note: available tokens are numbers, identifiers, and symbols + - * / % ^ ( ) , = == != < <= > >= || && ! ? :"
                )?;
            }
        }
        ParseErrTyp::Lex(LexErrTyp::InvalidNumber) => {
            writeln!(out, "note: parsing as floating point number")?;
        }
        ParseErrTyp::Syntax if err.message == "Unexpected token." => {
            writeln!(
                out,
                "note: implicit multiplication is not supported, so for example '5x' would be '5*x'"
            )?;
        }
        ParseErrTyp::UndefinedIdent(name) => {
            let vars = stdlib::VAR_NAMES.iter().copied();
            let consts = stdlib::CONSTANTS.iter().map(|(name, _)| *name);
            if let Some(similar) = stdlib::most_similar(name, vars.chain(consts)) {
                let kind = if stdlib::VAR_NAMES.contains(&similar) {
                    "variable"
                } else {
                    "constant"
                };
                writeln!(out, "note: {kind} '{similar}' has a similar name")?;
            }
        }
        ParseErrTyp::UnknownFunction(name) => {
            let intrinsics = INTRINSICS.iter().map(|fun| fun.name());
            if let Some(similar) = stdlib::most_similar(name, intrinsics.chain(functions.names())) {
                writeln!(out, "note: function '{similar}' has a similar name")?;
            }
        }
        ParseErrTyp::Syntax | ParseErrTyp::Semantic => {}
    }
    Ok(())
}

pub fn dump_tokens<W: Write>(mut out: W, src: &str) -> io::Result<()> {
    writeln!(out, "tokens: ")?;
    for tok in Lexer::new(src) {
        let text = tok.span.get(src);
        match tok.typ {
            TokTyp::End => writeln!(out, "  end")?,
            TokTyp::Error(err) => writeln!(out, "  error '{text}': {err}")?,
            TokTyp::Number(val) => writeln!(out, "  number {val:?}")?,
            TokTyp::Ident => writeln!(out, "  ident {text}")?,
            TokTyp::Symbol(sym) => writeln!(out, "  symbol {sym}")?,
        }
    }
    Ok(())
}

pub fn dump_reference<W: Write>(mut out: W) -> io::Result<()> {
    writeln!(out, "functions:")?;
    for fun in INTRINSICS {
        writeln!(out, "  {}", fun.usage())?;
    }
    writeln!(out, "constants:")?;
    for (name, val) in stdlib::CONSTANTS {
        writeln!(out, "  {name} = {val}")?;
    }
    Ok(())
}

pub fn formula_undefined<W: Write>(mut out: W, idx: usize) -> io::Result<()> {
    writeln!(out, "error: there is no formula {idx}")
}

pub fn no_formulas<W: Write>(mut out: W) -> io::Result<()> {
    writeln!(out, "error: no formula is defined")
}
