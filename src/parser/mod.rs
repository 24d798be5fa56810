//! # Datalog Parser
//!
//! Lexes and parses Datalog source text into statements. Handles facts,
//! rules, queries, deletions, negation, infix comparisons, quoted string
//! constants and `%` line comments.
//!
//! Statements are terminator-driven rather than line-driven: `.` inserts,
//! `?` queries and `~` deletes, so a statement may span lines and a line
//! may hold several statements.

use crate::ast::{Atom, Rule, Term};
use crate::error::{DatalogError, DatalogResult};
use crate::statement::Statement;

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Identifier, variable or number; the surface form is kept verbatim.
    Word(String),
    /// A `"..."` literal, unescaped.
    Quoted(String),
    /// `=`, `<>`, `<`, `<=`, `>`, `>=` (`!=` is normalized later).
    Operator(String),
    LParen,
    RParen,
    Comma,
    Implies,
    Dot,
    Question,
    Tilde,
}

/// A token paired with the line it started on, for error reporting.
#[derive(Debug, Clone, PartialEq)]
struct Spanned {
    token: Token,
    line: usize,
}

fn tokenize(source: &str) -> DatalogResult<Vec<Spanned>> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut line = 1;

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '%' => {
                // Line comment.
                for c in chars.by_ref() {
                    if c == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '(' => push_simple(&mut tokens, &mut chars, Token::LParen, line),
            ')' => push_simple(&mut tokens, &mut chars, Token::RParen, line),
            ',' => push_simple(&mut tokens, &mut chars, Token::Comma, line),
            '.' => push_simple(&mut tokens, &mut chars, Token::Dot, line),
            '?' => push_simple(&mut tokens, &mut chars, Token::Question, line),
            '~' => push_simple(&mut tokens, &mut chars, Token::Tilde, line),
            '"' => {
                chars.next();
                let mut literal = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some('n') => literal.push('\n'),
                            Some('t') => literal.push('\t'),
                            Some(escaped) => literal.push(escaped),
                            None => break,
                        },
                        '\n' => {
                            line += 1;
                            literal.push(c);
                        }
                        _ => literal.push(c),
                    }
                }
                if !closed {
                    return Err(parse_error(line, "unterminated string literal"));
                }
                tokens.push(Spanned { token: Token::Quoted(literal), line });
            }
            ':' => {
                chars.next();
                if chars.peek() == Some(&'-') {
                    chars.next();
                    tokens.push(Spanned { token: Token::Implies, line });
                } else {
                    return Err(parse_error(line, "expected '-' after ':'"));
                }
            }
            '=' => push_simple(&mut tokens, &mut chars, Token::Operator("=".into()), line),
            '<' => {
                chars.next();
                let op = match chars.peek() {
                    Some('=') => {
                        chars.next();
                        "<="
                    }
                    Some('>') => {
                        chars.next();
                        "<>"
                    }
                    _ => "<",
                };
                tokens.push(Spanned { token: Token::Operator(op.into()), line });
            }
            '>' => {
                chars.next();
                let op = if chars.peek() == Some(&'=') {
                    chars.next();
                    ">="
                } else {
                    ">"
                };
                tokens.push(Spanned { token: Token::Operator(op.into()), line });
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Spanned { token: Token::Operator("!=".into()), line });
                } else {
                    return Err(parse_error(line, "expected '=' after '!'"));
                }
            }
            c if c.is_alphanumeric() || c == '_' || c == '-' => {
                let mut word = String::new();
                if c == '-' {
                    // Only a numeric literal may start with '-'.
                    word.push(c);
                    chars.next();
                    if !chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                        return Err(parse_error(line, "expected a digit after '-'"));
                    }
                }
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        word.push(c);
                        chars.next();
                    } else if c == '.' && word.chars().all(is_numeric_char) {
                        // A '.' continues a numeral only when a digit
                        // follows; otherwise it is the statement terminator.
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        if lookahead.next().is_some_and(|c| c.is_ascii_digit()) {
                            word.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    } else {
                        break;
                    }
                }
                tokens.push(Spanned { token: Token::Word(word), line });
            }
            other => {
                return Err(parse_error(line, format!("unexpected character '{other}'")));
            }
        }
    }

    Ok(tokens)
}

fn is_numeric_char(c: char) -> bool {
    c.is_ascii_digit() || c == '-' || c == '.'
}

fn push_simple(
    tokens: &mut Vec<Spanned>,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    token: Token,
    line: usize,
) {
    chars.next();
    tokens.push(Spanned { token, line });
}

fn parse_error(line: usize, message: impl Into<String>) -> DatalogError {
    DatalogError::Parse { line, message: message.into() }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Spanned>,
    position: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Parser { tokens, position: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|s| &s.token)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.position.min(self.tokens.len().saturating_sub(1)))
            .map_or(1, |s| s.line)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let spanned = self.tokens.get(self.position).cloned();
        self.position += 1;
        spanned
    }

    fn at_end(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn error(&self, message: impl Into<String>) -> DatalogError {
        parse_error(self.line(), message)
    }

    /// statement := atom '.'
    ///            | atom ':-' goals '.'
    ///            | goals '?'
    ///            | goals '~'
    fn statement(&mut self) -> DatalogResult<Statement> {
        let first = self.goal()?;

        match self.peek() {
            Some(Token::Implies) => {
                self.advance();
                let body = self.goal_list()?;
                self.expect(Token::Dot, "expected '.' after rule")?;
                if first.negated {
                    return Err(self.error("rule head cannot be negated"));
                }
                Ok(Statement::InsertRule(Rule::new(first, body)))
            }
            Some(Token::Dot) => {
                self.advance();
                Ok(Statement::InsertFact(first))
            }
            Some(Token::Comma | Token::Question | Token::Tilde) => {
                let mut goals = vec![first];
                while self.peek() == Some(&Token::Comma) {
                    self.advance();
                    goals.push(self.goal()?);
                }
                match self.advance().map(|s| s.token) {
                    Some(Token::Question) => Ok(Statement::Query(goals)),
                    Some(Token::Tilde) => Ok(Statement::Delete(goals)),
                    Some(Token::Dot) => {
                        Err(self.error("a fact insertion takes a single atom; use '?' to query"))
                    }
                    _ => Err(self.error("expected '?' or '~' after goals")),
                }
            }
            _ => Err(self.error("expected '.', '?', '~', ',' or ':-' after atom")),
        }
    }

    fn goal_list(&mut self) -> DatalogResult<Vec<Atom>> {
        let mut goals = vec![self.goal()?];
        while self.peek() == Some(&Token::Comma) {
            self.advance();
            goals.push(self.goal()?);
        }
        Ok(goals)
    }

    /// goal := ['not'] (predicate '(' terms ')' | term OP term)
    fn goal(&mut self) -> DatalogResult<Atom> {
        let negated = matches!(self.peek(), Some(Token::Word(word)) if word == "not");
        if negated {
            self.advance();
        }

        let lhs = match self.advance().map(|s| s.token) {
            Some(Token::Word(word)) => Term::new(word),
            Some(Token::Quoted(literal)) => Term::quoted(literal),
            _ => return Err(self.error("expected a predicate or a term")),
        };

        let atom = match self.peek().cloned() {
            Some(Token::Operator(op)) => {
                self.advance();
                let rhs = self.term()?;
                Atom::new(op, vec![lhs, rhs])
            }
            Some(Token::LParen) => {
                if lhs.is_variable() {
                    return Err(self.error("a predicate cannot start with an uppercase letter"));
                }
                self.advance();
                let mut terms = vec![self.term()?];
                while self.peek() == Some(&Token::Comma) {
                    self.advance();
                    terms.push(self.term()?);
                }
                self.expect(Token::RParen, "expected ')' after terms")?;
                Atom::new(lhs.as_str(), terms)
            }
            _ => return Err(self.error("expected '(' or a comparison operator")),
        };

        Ok(if negated { atom.negate() } else { atom })
    }

    fn term(&mut self) -> DatalogResult<Term> {
        match self.advance().map(|s| s.token) {
            Some(Token::Word(word)) => Ok(Term::new(word)),
            Some(Token::Quoted(literal)) => Ok(Term::quoted(literal)),
            _ => Err(self.error("expected a term")),
        }
    }

    fn expect(&mut self, token: Token, message: &str) -> DatalogResult<()> {
        if self.peek() == Some(&token) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(message))
        }
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Parse a whole program into its statements.
pub fn parse_statements(source: &str) -> DatalogResult<Vec<Statement>> {
    let mut parser = Parser::new(tokenize(source)?);
    let mut statements = Vec::new();
    while !parser.at_end() {
        statements.push(parser.statement()?);
    }
    Ok(statements)
}

/// Parse exactly one statement; trailing input is an error.
pub fn parse_statement(source: &str) -> DatalogResult<Statement> {
    let mut parser = Parser::new(tokenize(source)?);
    let statement = parser.statement()?;
    if !parser.at_end() {
        return Err(parser.error("unexpected input after statement"));
    }
    Ok(statement)
}

/// Parse a comma-separated goal list without a terminator, as used by the
/// fluent query API.
pub fn parse_goals(source: &str) -> DatalogResult<Vec<Atom>> {
    let mut parser = Parser::new(tokenize(source)?);
    let goals = parser.goal_list()?;
    if !parser.at_end() {
        return Err(parser.error("unexpected input after goals"));
    }
    Ok(goals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::{expr, not, rule};

    #[test]
    fn parses_facts_rules_queries_and_deletions() {
        let statements = parse_statements(
            "edge(a, b).\n\
             path(X, Y) :- edge(X, Y).\n\
             path(a, X)?\n\
             edge(a, X)~",
        )
        .unwrap();
        assert_eq!(
            statements,
            vec![
                Statement::InsertFact(expr("edge", &["a", "b"])),
                Statement::InsertRule(rule(
                    expr("path", &["X", "Y"]),
                    vec![expr("edge", &["X", "Y"])]
                )),
                Statement::Query(vec![expr("path", &["a", "X"])]),
                Statement::Delete(vec![expr("edge", &["a", "X"])]),
            ]
        );
    }

    #[test]
    fn parses_negation_and_infix_comparisons() {
        let statement =
            parse_statement("p(X), not q(X), X <> a, X != b, N >= 2?").unwrap();
        match statement {
            Statement::Query(goals) => {
                assert_eq!(goals[1], not("q", &["X"]));
                assert_eq!(goals[2].predicate, "<>");
                // '!=' is normalized to '<>' at atom construction.
                assert_eq!(goals[3].predicate, "<>");
                assert_eq!(goals[4].predicate, ">=");
            }
            other => panic!("expected a query, got {other}"),
        }
    }

    #[test]
    fn quoted_strings_unescape_and_round_trip() {
        let statement = parse_statement(r#"says(alice, "hello \"world\"")."#).unwrap();
        let rendered = statement.to_string();
        assert_eq!(rendered, r#"says(alice, "hello \"world\"")."#);
        assert_eq!(parse_statement(&rendered).unwrap(), statement);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let statements = parse_statements(
            "% a comment\n\
             \n\
             p(a). % trailing comment\n\
             p(b).",
        )
        .unwrap();
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn statements_may_span_lines() {
        let statements = parse_statements("path(X, Y) :-\n  edge(X, Y).").unwrap();
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn numbers_keep_their_surface_form() {
        let statement = parse_statement("score(a, 1.50).").unwrap();
        assert_eq!(statement.to_string(), "score(a, 1.50).");
    }

    #[test]
    fn bare_number_keeps_its_statement_terminator() {
        let statements = parse_statements(
            "age(bob, 18).\n\
             adult(X) :- age(X, A), A >= 18.\n\
             adult(bob)?",
        )
        .unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0].to_string(), "age(bob, 18).");
        assert_eq!(statements[1].to_string(), "adult(X) :- age(X, A), A >= 18.");
    }

    #[test]
    fn negative_numbers_are_single_terms() {
        let statement = parse_statement("temp(city, -40)?").unwrap();
        assert_eq!(statement.to_string(), "temp(city, -40)?");
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = parse_statements("p(a).\nq(b?").unwrap_err();
        match err {
            DatalogError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("expected a parse error, got {other}"),
        }
    }

    #[test]
    fn rejects_multi_goal_fact_insertion() {
        let err = parse_statement("p(a), q(b).").unwrap_err();
        assert!(err.to_string().contains("single atom"));
    }

    #[test]
    fn rejects_negated_rule_head() {
        let err = parse_statement("not p(X) :- q(X).").unwrap_err();
        assert!(err.to_string().contains("head cannot be negated"));
    }

    #[test]
    fn rejects_uppercase_predicate() {
        assert!(parse_statement("Pred(a).").is_err());
    }

    #[test]
    fn rejects_unterminated_string() {
        assert!(parse_statements("says(a, \"oops).").is_err());
    }
}
