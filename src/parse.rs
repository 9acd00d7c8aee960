// SPDX: CC0-1.0

// precedence climbing parser, see https://en.wikipedia.org/wiki/Operator-precedence_parser#Precedence_climbing_method

use crate::{
    expr::{Associativity, BinaryOp, Callee, Expr, Precedence, UnaryOp, UserFunction},
    lex::{self, LexErrTyp, Span, SymbolId, Tok, TokTyp},
    registry::FunctionRegistry,
    stdlib::{self, Intrinsic},
};
use std::{collections::HashMap, sync::Arc};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseErrTyp {
    Lex(LexErrTyp),
    Syntax,
    UndefinedIdent(String),
    UnknownFunction(String),
    /// Arity mismatch, duplicate or recursive definition.
    Semantic,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("line {line}, column {column}: {message}")]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    /// Function being defined, empty outside a definition.
    pub function: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

type ParseResult<T> = Result<T, ParseErr>;

/// Deepest nesting of subexpressions a single formula may have.
const MAX_DEPTH: usize = 256;

enum Lookup {
    Found(Arc<UserFunction>),
    /// Defined in the current batch, but its definition failed to parse.
    Invalid,
    /// Refers back to a definition that is still being parsed.
    Recursive,
    Missing,
}

trait FunctionScope {
    fn lookup(&mut self, name: &str) -> Lookup;
}

impl FunctionScope for &FunctionRegistry {
    fn lookup(&mut self, name: &str) -> Lookup {
        match self.get(name) {
            Some(fun) => Lookup::Found(Arc::clone(fun)),
            None => Lookup::Missing,
        }
    }
}

struct Parser<'src, 'a> {
    src: &'src str,
    line: usize,
    function: &'src str,
    var_names: &'a [&'a str],
    scope: &'a mut dyn FunctionScope,
    tok: Tok,
    // position just past `tok`
    pos: usize,
    depth: usize,
}

impl<'src, 'a> Parser<'src, 'a> {
    fn at(
        src: &'src str,
        pos: usize,
        line: usize,
        function: &'src str,
        var_names: &'a [&'a str],
        scope: &'a mut dyn FunctionScope,
    ) -> ParseResult<Self> {
        let (tok, pos) = lex::advance(src, pos);
        let parser = Self {
            src,
            line,
            function,
            var_names,
            scope,
            tok,
            pos,
            depth: 0,
        };
        parser.check_lex()?;
        Ok(parser)
    }

    fn error(&self, typ: ParseErrTyp, span: Span, message: impl Into<String>) -> ParseErr {
        ParseErr {
            typ,
            function: self.function.to_string(),
            line: self.line,
            column: span.column(self.src),
            message: message.into(),
        }
    }

    fn fail<T>(&self, typ: ParseErrTyp, message: impl Into<String>) -> ParseResult<T> {
        Err(self.error(typ, self.tok.span, message))
    }

    fn check_lex(&self) -> ParseResult<()> {
        match self.tok.typ {
            TokTyp::Error(err) => self.fail(ParseErrTyp::Lex(err), err.to_string()),
            _ => Ok(()),
        }
    }

    fn advance(&mut self) -> ParseResult<()> {
        (self.tok, self.pos) = lex::advance(self.src, self.pos);
        self.check_lex()
    }

    fn expect(&mut self, sym: SymbolId) -> ParseResult<()> {
        if self.tok.is_symbol(sym) {
            self.advance()
        } else {
            self.fail(ParseErrTyp::Syntax, format!("'{sym}' expected."))
        }
    }

    fn enter(&mut self) -> ParseResult<()> {
        if self.depth >= MAX_DEPTH {
            return self.fail(ParseErrTyp::Syntax, "Expression too deeply nested.");
        }
        self.depth += 1;
        Ok(())
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        self.enter()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn ident(&self) -> Option<&'src str> {
        match self.tok.typ {
            TokTyp::Ident => Some(self.tok.span.get(self.src)),
            _ => None,
        }
    }

    /// `ternary (',' 'where' ternary)? End`
    fn parse_top_level(&mut self) -> ParseResult<Arc<Expr>> {
        let mut expr = self.parse_ternary()?;
        if self.tok.is_symbol(SymbolId::Comma) {
            self.advance()?;
            if self.ident() != Some("where") {
                return self.fail(ParseErrTyp::Syntax, "'where' expected.");
            }
            self.advance()?;
            let cond = self.parse_ternary()?;
            expr = Expr::domain_limit(expr, cond);
        }
        if !self.tok.is_end() {
            return self.fail(ParseErrTyp::Syntax, "Unexpected token.");
        }
        Ok(expr)
    }

    fn parse_ternary(&mut self) -> ParseResult<Arc<Expr>> {
        self.nested(|p| {
            let cond = p.parse_binary(Precedence::Or)?;
            if !p.tok.is_symbol(SymbolId::Question) {
                return Ok(cond);
            }
            p.advance()?;
            let then = p.parse_binary(Precedence::Or)?;
            p.expect(SymbolId::Colon)?;
            let other = p.parse_ternary()?;
            Ok(Expr::ternary(cond, then, other))
        })
    }

    fn binary_op(&self) -> Option<BinaryOp> {
        match self.tok.typ {
            TokTyp::Symbol(sym) => BinaryOp::from_symbol(sym),
            _ => None,
        }
    }

    fn parse_binary(&mut self, min: Precedence) -> ParseResult<Arc<Expr>> {
        let outer = self.depth;
        let mut left = self.parse_unary()?;
        while let Some(op) = self.binary_op() {
            let prec = op.precedence();
            if prec < min {
                break;
            }
            self.advance()?;
            // every fold puts `left` one level deeper
            self.enter()?;
            let right_min = match op.associativity() {
                Associativity::Left => prec.next(),
                Associativity::Right => prec,
            };
            let right = self.parse_binary(right_min)?;
            left = Expr::binary(op, left, right);
        }
        self.depth = outer;
        Ok(left)
    }

    fn parse_unary(&mut self) -> ParseResult<Arc<Expr>> {
        if let TokTyp::Symbol(sym) = self.tok.typ {
            if let Some(op) = UnaryOp::from_symbol(sym) {
                self.advance()?;
                let operand = self.nested(Self::parse_unary)?;
                return Ok(Expr::unary(op, operand));
            }
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> ParseResult<Arc<Expr>> {
        match self.tok.typ {
            TokTyp::Number(val) => {
                self.advance()?;
                Ok(Expr::constant(val))
            }
            TokTyp::Ident => {
                let span = self.tok.span;
                self.advance()?;
                self.resolve(span)
            }
            TokTyp::Symbol(SymbolId::OpenParen) => {
                self.advance()?;
                let expr = self.parse_ternary()?;
                self.expect(SymbolId::CloseParen)?;
                Ok(expr)
            }
            _ => self.fail(ParseErrTyp::Syntax, "Expression expected."),
        }
    }

    /// Resolves the identifier at `span`, which has just been consumed.
    fn resolve(&mut self, span: Span) -> ParseResult<Arc<Expr>> {
        let name = span.get(self.src);
        if let Some(idx) = self.var_names.iter().position(|var| *var == name) {
            return Ok(Expr::var(idx));
        }
        if let Some(val) = stdlib::constant(name) {
            return Ok(Expr::constant(val));
        }
        if self.tok.is_symbol(SymbolId::OpenParen) {
            return self.parse_call(span);
        }
        Err(self.error(
            ParseErrTyp::UndefinedIdent(name.to_string()),
            span,
            format!("Undefined variable or constant: {name}."),
        ))
    }

    fn parse_call(&mut self, span: Span) -> ParseResult<Arc<Expr>> {
        let name = span.get(self.src);
        let callee = match Intrinsic::lookup(name) {
            Some(fun) => Callee::Intrinsic(fun),
            None => match self.scope.lookup(name) {
                Lookup::Found(fun) => Callee::User(fun),
                Lookup::Invalid => {
                    return Err(self.error(
                        ParseErrTyp::Semantic,
                        span,
                        format!("Function {name}() has errors."),
                    ))
                }
                Lookup::Recursive => {
                    return Err(self.error(
                        ParseErrTyp::Semantic,
                        span,
                        format!("Recursive reference to function: {name}."),
                    ))
                }
                Lookup::Missing => {
                    return Err(self.error(
                        ParseErrTyp::UnknownFunction(name.to_string()),
                        span,
                        format!("Unknown function: {name}."),
                    ))
                }
            },
        };

        self.expect(SymbolId::OpenParen)?;
        let mut args = vec![self.parse_ternary()?];
        while self.tok.is_symbol(SymbolId::Comma) {
            self.advance()?;
            args.push(self.parse_ternary()?);
        }
        self.expect(SymbolId::CloseParen)?;

        let arity = callee.arity();
        if args.len() != arity {
            return Err(self.error(
                ParseErrTyp::Semantic,
                span,
                format!(
                    "{arity} argument{s} expected for {name}().",
                    s = if arity == 1 { "" } else { "s" }
                ),
            ));
        }
        Ok(Expr::call(callee, args))
    }
}

/// Parses a single formula over `var_names` and returns its simplified tree.
pub fn parse_expression(
    text: &str,
    functions: &FunctionRegistry,
    var_names: &[&str],
) -> Result<Arc<Expr>, ParseErr> {
    parse_unsimplified(text, functions, var_names).map(|expr| expr.simplify())
}

/// Like [`parse_expression`], but keeps the tree as written.
pub fn parse_unsimplified(
    text: &str,
    functions: &FunctionRegistry,
    var_names: &[&str],
) -> Result<Arc<Expr>, ParseErr> {
    let mut scope = functions;
    let mut parser = Parser::at(text, 0, 1, "", var_names, &mut scope)?;
    parser.parse_top_level()
}

enum DefState {
    Pending,
    InProgress,
    Done(Arc<UserFunction>),
    Failed,
}

/// A definition whose header `name(params) =` parsed cleanly.
struct Definition<'src> {
    src: &'src str,
    line: usize,
    name: &'src str,
    params: Vec<&'src str>,
    body_start: usize,
    state: DefState,
}

struct NoFunctions;

impl FunctionScope for NoFunctions {
    fn lookup(&mut self, _name: &str) -> Lookup {
        Lookup::Missing
    }
}

fn parse_header<'src>(
    src: &'src str,
    line: usize,
    registry: &FunctionRegistry,
    batch: &HashMap<&str, usize>,
) -> ParseResult<Definition<'src>> {
    let mut none = NoFunctions;
    let mut p = Parser::at(src, 0, line, "", &[], &mut none)?;

    let Some(name) = p.ident() else {
        return p.fail(ParseErrTyp::Syntax, "Function name expected.");
    };
    p.function = name;
    if Intrinsic::lookup(name).is_some() {
        return p.fail(
            ParseErrTyp::Semantic,
            format!("{name}() is an intrinsic function."),
        );
    }
    if stdlib::constant(name).is_some() {
        return p.fail(
            ParseErrTyp::Semantic,
            format!("{name} is a named constant."),
        );
    }
    if registry.contains(name) || batch.contains_key(name) {
        return p.fail(
            ParseErrTyp::Semantic,
            format!("Function already defined: {name}."),
        );
    }
    p.advance()?;
    p.expect(SymbolId::OpenParen)?;

    let mut params: Vec<&'src str> = Vec::new();
    loop {
        let Some(param) = p.ident() else {
            return p.fail(ParseErrTyp::Syntax, "Parameter name expected.");
        };
        if params.contains(&param) {
            return p.fail(
                ParseErrTyp::Semantic,
                format!("Duplicate parameter name: {param}."),
            );
        }
        params.push(param);
        p.advance()?;
        if !p.tok.is_symbol(SymbolId::Comma) {
            break;
        }
        p.advance()?;
    }
    p.expect(SymbolId::CloseParen)?;
    p.expect(SymbolId::Assign)?;

    Ok(Definition {
        src,
        line,
        name,
        params,
        body_start: p.tok.span.start,
        state: DefState::Pending,
    })
}

/// Resolves calls while a batch is parsed: functions already in the registry,
/// then definitions of the batch, parsing those on demand.
struct BatchScope<'src, 'r> {
    defs: Vec<Definition<'src>>,
    by_name: HashMap<&'src str, usize>,
    registry: &'r mut FunctionRegistry,
    errors: Vec<ParseErr>,
}

impl BatchScope<'_, '_> {
    fn define(&mut self, idx: usize) -> Lookup {
        match &self.defs[idx].state {
            DefState::Pending => {}
            DefState::InProgress => return Lookup::Recursive,
            DefState::Done(fun) => return Lookup::Found(Arc::clone(fun)),
            DefState::Failed => return Lookup::Invalid,
        }
        let def = &mut self.defs[idx];
        def.state = DefState::InProgress;
        let (src, line, name, body_start) = (def.src, def.line, def.name, def.body_start);
        let params = def.params.clone();

        let body = Parser::at(src, body_start, line, name, &params, self)
            .and_then(|mut parser| parser.parse_top_level());

        let (state, lookup) = match body {
            Ok(body) => {
                let fun = Arc::new(UserFunction {
                    name: name.to_string(),
                    params: params.iter().map(|param| param.to_string()).collect(),
                    body: body.simplify(),
                });
                tracing::trace!(line, "defined {fun}");
                self.registry.insert(Arc::clone(&fun));
                (DefState::Done(Arc::clone(&fun)), Lookup::Found(fun))
            }
            Err(err) => {
                tracing::trace!(line, "definition of {name} failed: {err}");
                self.errors.push(err);
                (DefState::Failed, Lookup::Invalid)
            }
        };
        self.defs[idx].state = state;
        lookup
    }
}

impl FunctionScope for BatchScope<'_, '_> {
    fn lookup(&mut self, name: &str) -> Lookup {
        if let Some(fun) = self.registry.get(name) {
            return Lookup::Found(Arc::clone(fun));
        }
        match self.by_name.get(name) {
            Some(&idx) => self.define(idx),
            None => Lookup::Missing,
        }
    }
}

/// Parses one function definition per line into `registry`.
///
/// Each line is parsed on its own: a bad line is reported and skipped while
/// the others are still defined. Definitions may call each other in any
/// order, but not recursively. Returns the errors ordered by line.
pub fn parse_function_defs(text: &str, registry: &mut FunctionRegistry) -> Vec<ParseErr> {
    let mut errors = Vec::new();
    let mut defs = Vec::new();
    let mut by_name = HashMap::new();

    for (idx, src) in text.lines().enumerate() {
        if src.trim().is_empty() {
            continue;
        }
        match parse_header(src, idx + 1, registry, &by_name) {
            Ok(def) => {
                by_name.insert(def.name, defs.len());
                defs.push(def);
            }
            Err(err) => errors.push(err),
        }
    }

    let mut scope = BatchScope {
        defs,
        by_name,
        registry,
        errors,
    };
    for idx in 0..scope.defs.len() {
        scope.define(idx);
    }

    let mut errors = scope.errors;
    errors.sort_by_key(|err| err.line);
    tracing::debug!(
        functions = scope.registry.len(),
        errors = errors.len(),
        "parsed function definitions"
    );
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stdlib::VAR_NAMES;

    fn parse(text: &str) -> ParseResult<Arc<Expr>> {
        parse_expression(text, &FunctionRegistry::new(), VAR_NAMES)
    }

    fn eval(text: &str, x: f64) -> f64 {
        match parse(text) {
            Ok(expr) => expr.eval(&[x]),
            Err(err) => panic!("{text:?}: {err}"),
        }
    }

    fn err(text: &str) -> ParseErr {
        match parse(text) {
            Ok(expr) => panic!("{text:?} parsed as {expr}"),
            Err(err) => err,
        }
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let n = 10_000;
        let parens = format!("{}x{}", "(".repeat(n), ")".repeat(n));
        let negations = format!("{}x", "-".repeat(n));
        let powers = format!("{}2", "2^".repeat(n));
        let sum = format!("x{}", "+1".repeat(n));
        for text in [&parens, &negations, &powers, &sum] {
            assert_eq!(err(text).message, "Expression too deeply nested.");
        }
    }

    #[test]
    fn moderate_nesting_parses() {
        let parens = format!("{}x{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(eval(&parens, 3.0), 3.0);
        assert_eq!(eval(&format!("{}x", "-".repeat(200)), 3.0), 3.0);
        assert_eq!(eval(&format!("x{}", "+1".repeat(200)), 0.0), 200.0);
    }

    #[test]
    fn precedence() {
        assert_eq!(eval("1 + 2 * 3 ^ 2", 0.0), 19.0);

        let parsed = parse("1 + 2 * x ^ 2").unwrap();
        let built = Expr::binary(
            BinaryOp::Add,
            Expr::constant(1.0),
            Expr::binary(
                BinaryOp::Mul,
                Expr::constant(2.0),
                Expr::binary(BinaryOp::Pow, Expr::var(0), Expr::constant(2.0)),
            ),
        );
        assert!(parsed.is_equivalent(&built));
    }

    #[test]
    fn associativity() {
        assert_eq!(eval("8 / 4 / 2", 0.0), 1.0);
        assert_eq!(eval("2 ^ 2 ^ 3", 0.0), 256.0);
        assert_eq!(eval("10 - 4 - 3", 0.0), 3.0);
        assert_eq!(eval("7 % 4 * 2", 0.0), 6.0);
    }

    #[test]
    fn unary_binds_tighter_than_power() {
        assert_eq!(eval("-2 ^ 2", 0.0), 4.0);
        assert_eq!(eval("--x", 3.0), 3.0);
        assert_eq!(eval("2 * -x", 3.0), -6.0);
    }

    #[test]
    fn boolean_convention() {
        assert_eq!(eval("1 < 2", 0.0), 1.0);
        assert!(eval("1 > 2", 0.0).is_nan());
        assert!(eval("(1<2) && (3>4)", 0.0).is_nan());
        assert_eq!(eval("1 > 2 || 2 >= 2", 0.0), 1.0);
        assert_eq!(eval("x = 3", 3.0), 1.0);
        assert_eq!(eval("x == 3", 3.0), 1.0);
        assert!(eval("x != 3", 3.0).is_nan());
        assert_eq!(eval("!False", 0.0), 1.0);
        assert_eq!(eval("True", 0.0), 1.0);
    }

    #[test]
    fn comparison_binds_looser_than_arithmetic() {
        assert_eq!(eval("x + 1 > 2 && x < 5", 3.0), 1.0);
        assert!(eval("x + 1 > 2 && x < 5", 1.0).is_nan());
    }

    #[test]
    fn ternary_is_right_associative() {
        let text = "x < 0 ? -1 : x > 0 ? 1 : 0";
        assert_eq!(eval(text, -5.0), -1.0);
        assert_eq!(eval(text, 5.0), 1.0);
        assert_eq!(eval(text, 0.0), 0.0);
    }

    #[test]
    fn where_clause_limits_domain() {
        let text = "1/x, where x > 0";
        assert!(eval(text, 0.0).is_nan());
        assert!(eval(text, -2.0).is_nan());
        assert_eq!(eval(text, 4.0), 0.25);
        assert!(matches!(*parse(text).unwrap(), Expr::DomainLimit(..)));
    }

    #[test]
    fn constants_and_intrinsics() {
        assert_eq!(eval("pi", 0.0), core::f64::consts::PI);
        assert!((eval("atan2(1, 1) * 4", 0.0) - core::f64::consts::PI).abs() < 1e-12);
        assert_eq!(eval("clamp(x, 0, 1)", 5.0), 1.0);
        assert!(eval("sqrt(x)", -1.0).is_nan());
        assert_eq!(eval("inf", 0.0), f64::INFINITY);
        assert!(eval("NaN", 0.0).is_nan());
    }

    #[test]
    fn constant_formula_folds() {
        let expr = parse("sqrt(16) + 2 * pi").unwrap();
        assert!(matches!(*expr, Expr::Const(_)));
    }

    #[test]
    fn error_after_trailing_operator() {
        let err = err("2 +");
        assert_eq!(err.typ, ParseErrTyp::Syntax);
        assert_eq!((err.line, err.column), (1, 4));
        assert_eq!(err.message, "Expression expected.");
        assert!(err.function.is_empty());
    }

    #[test]
    fn missing_close_paren() {
        let err = err("(x + 1");
        assert_eq!(err.message, "')' expected.");
        assert_eq!(err.column, 7);
        assert_eq!(self::err("sin(x").message, "')' expected.");
    }

    #[test]
    fn undefined_identifier() {
        let err = err("x + q");
        assert_eq!(err.typ, ParseErrTyp::UndefinedIdent("q".into()));
        assert_eq!(err.message, "Undefined variable or constant: q.");
        assert_eq!(err.column, 5);
    }

    #[test]
    fn arity_mismatch() {
        let err = err("atan2(x)");
        assert_eq!(err.message, "2 arguments expected for atan2().");
        assert_eq!(err.column, 1);
        assert_eq!(
            self::err("sin(x, 1)").message,
            "1 argument expected for sin()."
        );
    }

    #[test]
    fn unknown_function() {
        let err = err("2 * sine(x)");
        assert_eq!(err.typ, ParseErrTyp::UnknownFunction("sine".into()));
        assert_eq!(err.column, 5);
    }

    #[test]
    fn lexical_errors() {
        let err = err("x # 2");
        assert_eq!(err.typ, ParseErrTyp::Lex(LexErrTyp::InvalidChar));
        assert_eq!(err.column, 3);
        assert_eq!(self::err("x | 1").message, "Invalid character.");
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert_eq!(err("x 2").message, "Unexpected token.");
        assert_eq!(err("x, 2").message, "'where' expected.");
        assert_eq!(err("x ? 1").message, "':' expected.");
    }

    #[test]
    fn semicolon_ends_formula() {
        assert_eq!(eval("x + 1; this is ignored", 1.0), 2.0);
    }

    #[test]
    fn whitespace_does_not_change_tree() {
        let a = parse("x^2+sin( x )").unwrap();
        let b = parse("  x ^ 2 + sin(x)").unwrap();
        assert!(a.is_equivalent(&b));
        assert!(b.is_equivalent(&a));
        assert!(!a.is_equivalent(&parse("x^2+cos(x)").unwrap()));
    }

    #[test]
    fn display_round_trips() {
        for text in [
            "(x + 1) * x ^ 2 ^ 3",
            "x < 0 ? -x : sqrt(x), where x > -4",
            "-(x - 1) % 3",
            "!(x > 1 || x < -1)",
        ] {
            let expr = parse(text).unwrap();
            let again = parse(&expr.to_string()).unwrap();
            assert!(expr.is_equivalent(&again), "{text:?} -> {expr}");
        }
    }

    #[test]
    fn other_variable_names() {
        let expr = parse_expression("a * b", &FunctionRegistry::new(), &["a", "b"]).unwrap();
        assert_eq!(expr.eval(&[3.0, 4.0]), 12.0);
    }

    fn define(text: &str) -> (FunctionRegistry, Vec<ParseErr>) {
        let mut reg = FunctionRegistry::new();
        let errors = parse_function_defs(text, &mut reg);
        (reg, errors)
    }

    #[test]
    fn functions_can_call_earlier_functions() {
        let (reg, errors) = define("double(x) = 2*x\nquad(x) = double(double(x))");
        assert!(errors.is_empty(), "{errors:?}");
        let expr = parse_expression("quad(3)", &reg, VAR_NAMES).unwrap();
        assert_eq!(expr.eval(&[]), 12.0);
        let expr = parse_expression("quad(x)", &reg, VAR_NAMES).unwrap();
        assert_eq!(expr.eval(&[0.5]), 2.0);
    }

    #[test]
    fn functions_can_call_later_functions() {
        let (reg, errors) = define("hyp(a, b) = sqrt(sqr(a) + sq(b))\n\nsq(v) = v * v\n");
        assert!(errors.is_empty(), "{errors:?}");
        let expr = parse_expression("hyp(x, 4)", &reg, VAR_NAMES).unwrap();
        assert_eq!(expr.eval(&[3.0]), 5.0);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn bad_line_does_not_block_others() {
        let (reg, errors) = define("f(x) = x +\ng(x) = x * 2\nh(x) = g(x) + 1");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].function, "f");
        assert_eq!((errors[0].line, errors[0].column), (1, 11));
        assert!(reg.contains("g") && reg.contains("h"));
        assert!(!reg.contains("f"));
    }

    #[test]
    fn duplicate_and_reserved_names() {
        let (reg, errors) = define("f(x) = 1\nf(y) = 2\nsin(x) = x\npi(x) = x");
        let messages: Vec<&str> = errors.iter().map(|err| err.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "Function already defined: f.",
                "sin() is an intrinsic function.",
                "pi is a named constant.",
            ]
        );
        assert_eq!(errors[0].line, 2);
        assert_eq!(reg.get("f").map(|f| f.body.eval(&[0.0])), Some(1.0));
    }

    #[test]
    fn existing_registry_entries_are_reserved() {
        let (mut reg, errors) = define("f(x) = x");
        assert!(errors.is_empty());
        let errors = parse_function_defs("f(x) = 2", &mut reg);
        assert_eq!(errors[0].message, "Function already defined: f.");
    }

    #[test]
    fn header_errors() {
        let (_, errors) = define("(x) = 1\nf x = 1\nf(x, x) = 1\nf(x) 1\nf() = 1");
        let got: Vec<(usize, usize, &str)> = errors
            .iter()
            .map(|err| (err.line, err.column, err.message.as_str()))
            .collect();
        assert_eq!(
            got,
            [
                (1, 1, "Function name expected."),
                (2, 3, "'(' expected."),
                (3, 6, "Duplicate parameter name: x."),
                (4, 6, "'=' expected."),
                (5, 3, "Parameter name expected."),
            ]
        );
    }

    #[test]
    fn recursion_is_rejected() {
        let (reg, errors) = define("f(x) = f(x - 1)");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Recursive reference to function: f.");
        assert_eq!(errors[0].column, 8);
        assert!(reg.is_empty());
    }

    #[test]
    fn mutual_recursion_is_rejected() {
        let (reg, errors) = define("even(n) = n = 0 ? 1 : odd(n - 1)\nodd(n) = even(n - 1)\nok(n) = n");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].function, "even");
        assert_eq!(errors[0].message, "Function odd() has errors.");
        assert_eq!(errors[1].function, "odd");
        assert_eq!(errors[1].message, "Recursive reference to function: even.");
        assert_eq!(reg.names().collect::<Vec<_>>(), ["ok"]);
    }

    #[test]
    fn where_clause_in_function_body() {
        let (reg, errors) = define("inv(x) = 1 / x, where x != 0");
        assert!(errors.is_empty());
        let expr = parse_expression("inv(x)", &reg, VAR_NAMES).unwrap();
        assert_eq!(expr.eval(&[2.0]), 0.5);
        assert!(expr.eval(&[0.0]).is_nan());
    }

    #[test]
    fn parameters_shadow_constants() {
        let (reg, errors) = define("f(e) = e * 2");
        assert!(errors.is_empty());
        let expr = parse_expression("f(5)", &reg, VAR_NAMES).unwrap();
        assert_eq!(expr.eval(&[]), 10.0);
    }
}
