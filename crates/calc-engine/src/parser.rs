//! Expression parser
//!
//! Recursive descent over the token stream, lowest precedence first:
//!
//! | Level   | Operators                     |
//! |---------|-------------------------------|
//! | Logical | `&&` `\|\|`                   |
//! | Compare | `=` `==` `<>` `<` `>` `<=` `>=` |
//! | AddSub  | `+` `-`                       |
//! | MulDiv  | `*` `/` `\`                   |
//! | Power   | `^` (left-associative)        |
//! | Unary   | `+` `-`                       |
//!
//! Identifiers resolve, in order, to a registered function, a declared
//! variable, a host external object and finally a binding path into the data
//! context.

use crate::ast::{BinaryOperator, BindingPath, BindingStep, Expr, FunctionCall, NodeId, UnaryOperator, VariableRef};
use crate::engine::Engine;
use crate::error::{CalcError, CalcResult};
use crate::tokenizer::{error_context, Token, TokenCategory, TokenKind, Tokenizer};

/// Parse an expression against the engine's functions, variables and data context
pub fn parse(engine: &Engine, source: &str) -> CalcResult<Expr> {
    let mut parser = Parser::new(engine, source)?;
    let expr = parser.parse_logical()?;
    if parser.token.kind != TokenKind::End {
        return Err(parser.error("Unexpected token"));
    }
    Ok(expr)
}

struct Parser<'a> {
    engine: &'a Engine,
    tokenizer: Tokenizer<'a>,
    token: Token,
    /// End of the last consumed token
    last_end: usize,
    next_id: u32,
}

impl<'a> Parser<'a> {
    fn new(engine: &'a Engine, source: &'a str) -> CalcResult<Self> {
        let mut tokenizer = Tokenizer::new(source, engine.culture(), engine.identifier_chars());
        let token = tokenizer.next_token()?;
        Ok(Self {
            engine,
            last_end: token.start,
            tokenizer,
            token,
            next_id: 0,
        })
    }

    fn advance(&mut self) -> CalcResult<()> {
        self.last_end = self.token.end;
        self.token = self.tokenizer.next_token()?;
        Ok(())
    }

    fn error(&self, message: &str) -> CalcError {
        CalcError::syntax(
            message,
            error_context(self.tokenizer.source(), self.token.start, self.token.end),
        )
    }

    fn node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    // === Precedence ladder ===

    fn parse_logical(&mut self) -> CalcResult<Expr> {
        let mut left = self.parse_compare()?;
        while self.token.category == TokenCategory::Logical {
            let op = match self.token.kind {
                TokenKind::And => BinaryOperator::And,
                _ => BinaryOperator::Or,
            };
            self.advance()?;
            let right = self.parse_compare()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_compare(&mut self) -> CalcResult<Expr> {
        let mut left = self.parse_add_sub()?;
        while self.token.category == TokenCategory::Compare {
            let op = match self.token.kind {
                TokenKind::Eq => BinaryOperator::Equal,
                TokenKind::Ne => BinaryOperator::NotEqual,
                TokenKind::Lt => BinaryOperator::LessThan,
                TokenKind::Le => BinaryOperator::LessEqual,
                TokenKind::Gt => BinaryOperator::GreaterThan,
                _ => BinaryOperator::GreaterEqual,
            };
            self.advance()?;
            let right = self.parse_add_sub()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_add_sub(&mut self) -> CalcResult<Expr> {
        let mut left = self.parse_mul_div()?;
        while self.token.category == TokenCategory::AddSub {
            let op = match self.token.kind {
                TokenKind::Add => BinaryOperator::Add,
                _ => BinaryOperator::Subtract,
            };
            self.advance()?;
            let right = self.parse_mul_div()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_mul_div(&mut self) -> CalcResult<Expr> {
        let mut left = self.parse_power()?;
        while self.token.category == TokenCategory::MulDiv {
            let op = match self.token.kind {
                TokenKind::Mul => BinaryOperator::Multiply,
                TokenKind::Div => BinaryOperator::Divide,
                _ => BinaryOperator::IntDivide,
            };
            self.advance()?;
            let right = self.parse_power()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> CalcResult<Expr> {
        let mut left = self.parse_unary()?;
        while self.token.category == TokenCategory::Power {
            self.advance()?;
            let right = self.parse_unary()?;
            left = binary(BinaryOperator::Power, left, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> CalcResult<Expr> {
        let op = match self.token.kind {
            TokenKind::Add => UnaryOperator::Plus,
            TokenKind::Sub => UnaryOperator::Negate,
            _ => return self.parse_atom(),
        };
        self.advance()?;
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    // === Atoms ===

    fn parse_atom(&mut self) -> CalcResult<Expr> {
        match self.token.category {
            TokenCategory::Literal => {
                let value = self.token.value.clone();
                self.advance()?;
                Ok(Expr::Literal(value))
            }
            TokenCategory::Identifier => self.parse_identifier(),
            TokenCategory::Group => match self.token.kind.closing() {
                Some(close) => {
                    self.advance()?;
                    let expr = self.parse_logical()?;
                    if self.token.kind != close {
                        return Err(self.error("Unbalanced parenthesis"));
                    }
                    self.advance()?;
                    Ok(expr)
                }
                None if self.token.kind == TokenKind::End => {
                    Err(self.error("Unexpected end of expression"))
                }
                None => Err(self.error("Unexpected token")),
            },
            _ => Err(self.error("Unexpected token")),
        }
    }

    fn parse_identifier(&mut self) -> CalcResult<Expr> {
        let start = self.token.start;
        let name = match self.token.identifier() {
            Some(name) => name.to_string(),
            None => return Err(self.error("Identifier expected")),
        };

        if let Some(def) = self.engine.functions().get(&name).cloned() {
            let id = self.node_id();
            self.advance()?;
            let args = match self.token.kind {
                TokenKind::Open => self.parse_list()?,
                _ => Vec::new(),
            };
            def.check_arity(args.len())?;
            return Ok(Expr::Function(FunctionCall { id, def, args }));
        }

        if self.engine.variable(&name).is_some() {
            let id = self.node_id();
            self.advance()?;
            let index = match self.token.kind {
                TokenKind::BracketOpen => self.parse_list()?,
                _ => Vec::new(),
            };
            return Ok(Expr::Variable(VariableRef { id, name, index }));
        }

        if let Some(value) = self.engine.external_object(&name) {
            self.advance()?;
            return Ok(Expr::Literal(value));
        }

        if self.engine.data_context().is_some()
            && !self.engine.options().is_skipped(&name)
        {
            return self.parse_binding(name, start);
        }

        Err(self.error("Unexpected identifier"))
    }

    /// `name[(args)].name[[args]]...` starting at the current identifier
    fn parse_binding(&mut self, first: String, start: usize) -> CalcResult<Expr> {
        let id = self.node_id();
        let mut steps = Vec::new();
        let mut name = first;
        self.advance()?;

        loop {
            let args = match self.token.kind {
                TokenKind::Open | TokenKind::BracketOpen => Some(self.parse_list()?),
                _ => None,
            };
            steps.push(BindingStep::new(name, args));

            if self.token.kind != TokenKind::Period {
                break;
            }
            self.advance()?;
            name = match self.token.identifier() {
                Some(next) => next.to_string(),
                None => return Err(self.error("Identifier expected")),
            };
            self.advance()?;
        }

        let text = self.tokenizer.source()[start..self.last_end].to_string();
        Ok(Expr::Binding(BindingPath { id, steps, text }))
    }

    /// Comma-separated list inside the current group token; `()` is empty
    fn parse_list(&mut self) -> CalcResult<Vec<Expr>> {
        let Some(close) = self.token.kind.closing() else {
            return Err(self.error("Unexpected token"));
        };
        self.advance()?;

        let mut items = Vec::new();
        if self.token.kind == close {
            self.advance()?;
            return Ok(items);
        }

        loop {
            items.push(self.parse_logical()?);
            match self.token.kind {
                TokenKind::Comma => self.advance()?,
                kind if kind == close => {
                    self.advance()?;
                    return Ok(items);
                }
                _ => return Err(self.error("Unbalanced parenthesis")),
            }
        }
    }
}

fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CalcError;
    use calc_engine_core::{Record, Value};
    use pretty_assertions::assert_eq;

    fn engine() -> Engine {
        let mut engine = Engine::new();
        engine.set_optimize_expressions(false);
        engine
    }

    fn syntax_context(result: CalcResult<Expr>) -> (String, String) {
        match result {
            Err(CalcError::Syntax { message, context }) => (message, context),
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        let engine = engine();
        assert_eq!(parse(&engine, "1 + 2 * 3").unwrap().to_string(), "1 + (2 * 3)");
        assert_eq!(parse(&engine, "(1 + 2) * 3").unwrap().to_string(), "(1 + 2) * 3");
        assert_eq!(parse(&engine, "2^3^2").unwrap().to_string(), "(2 ^ 3) ^ 2");
        assert_eq!(parse(&engine, "-2^2").unwrap().to_string(), "-2 ^ 2");
        assert_eq!(
            parse(&engine, "1 < 2 && 3 >= 4 || true").unwrap().to_string(),
            "((1 < 2) && (3 >= 4)) || TRUE()"
        );
    }

    #[test]
    fn test_groups() {
        let engine = engine();
        assert_eq!(parse(&engine, "[1 + 2] * {3}").unwrap().to_string(), "(1 + 2) * 3");
        let (message, context) = syntax_context(parse(&engine, "(1 + 2]"));
        assert_eq!(message, "Unbalanced parenthesis");
        assert_eq!(context, "(1 + 2[]]");
    }

    #[test]
    fn test_functions() {
        let engine = engine();
        assert_eq!(parse(&engine, "pi").unwrap().to_string(), "PI()");
        assert_eq!(parse(&engine, "Sum(1, 2)").unwrap().to_string(), "SUM(1, 2)");
        assert!(matches!(
            parse(&engine, "IF(true)"),
            Err(CalcError::ArgumentCount { .. })
        ));
        assert!(matches!(
            parse(&engine, "ABS(1, 2)"),
            Err(CalcError::ArgumentCount { .. })
        ));
    }

    #[test]
    fn test_variables() {
        let mut engine = engine();
        engine.set_variable("Items", Value::array([1, 2, 3]));
        let expr = parse(&engine, "items[1] * 2").unwrap();
        assert_eq!(expr.to_string(), "items[1] * 2");
    }

    #[test]
    fn test_binding_paths() {
        let mut engine = engine();
        engine.set_data_context(Record::new("Person").with("Name", "Ann"));

        let expr = parse(&engine, "15*ChildrenDct(\"Test Child 2\").Age+14").unwrap();
        let Expr::Binary { left, .. } = &expr else {
            panic!("expected a binary node");
        };
        let Expr::Binary { right, .. } = left.as_ref() else {
            panic!("expected a binary node");
        };
        let Expr::Binding(path) = right.as_ref() else {
            panic!("expected a binding path");
        };
        assert_eq!(path.text, "ChildrenDct(\"Test Child 2\").Age");
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[0].indexer().map(<[Expr]>::len), Some(1));

        let expr = parse(&engine, "Children[2].Name").unwrap();
        assert_eq!(expr.to_string(), "Children[2].Name");
    }

    #[test]
    fn test_skipped_identifiers() {
        let mut engine = engine();
        engine.set_data_context(Record::new("Person"));
        engine.options_mut().skipped_variables_for_parsing = vec!["Total".into()];
        let (message, _) = syntax_context(parse(&engine, "Total + 1"));
        assert_eq!(message, "Unexpected identifier");
    }

    #[test]
    fn test_unexpected_identifier_without_context() {
        let engine = engine();
        let (message, context) = syntax_context(parse(&engine, "1 + Name"));
        assert_eq!(message, "Unexpected identifier");
        assert_eq!(context, "1 + [Name]");
    }

    #[test]
    fn test_trailing_tokens() {
        let engine = engine();
        let (message, context) = syntax_context(parse(&engine, "1,234.5"));
        assert_eq!(message, "Unexpected token");
        assert_eq!(context, "1[,]234.5");
        assert!(parse(&engine, "").is_err());
        assert!(parse(&engine, "\"$ELO: 1 #Amor: ei ole 1").is_err());
        assert!(parse(&engine, "$ELO: 1 #Amor: ei ole 1").is_err());
    }

    #[test]
    fn test_node_ids_in_parse_order() {
        let mut engine = engine();
        engine.set_variable("x", 1);
        let expr = parse(&engine, "ABS(x) + SUM(x, 2)").unwrap();
        let mut ids = Vec::new();
        expr.walk(&mut |node| match node {
            Expr::Function(call) => ids.push(call.id.0),
            Expr::Variable(var) => ids.push(var.id.0),
            _ => {}
        });
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }
}
