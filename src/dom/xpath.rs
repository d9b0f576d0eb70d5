// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! XPath 1.0 subset
//!
//! Location paths over the forward and reverse axes most scrapers use,
//! predicates, unions, comparisons and a core function library. Results
//! come back in document order.

use std::collections::HashMap;

use crate::error::{Error, Result};

use super::document::Document;
use super::node::{escape_attr, string_value, Node, NodeData, NodeId, NodeType};

/// A compiled XPath expression
#[derive(Debug, Clone)]
pub struct XPath {
    source: String,
    expr: Expr,
}

/// One item of an XPath result
#[derive(Debug, Clone)]
pub enum XPathMatch {
    /// Element, text or comment node
    Node(Node),
    /// Attribute node
    Attribute { name: String, value: String },
    /// Result of an expression that does not select nodes, e.g. `count(//a)`
    Value(String),
}

impl XPathMatch {
    /// String value of the match
    pub fn text(&self) -> String {
        match self {
            XPathMatch::Node(node) => node.text_content(),
            XPathMatch::Attribute { value, .. } => value.clone(),
            XPathMatch::Value(s) => s.clone(),
        }
    }

    /// Markup of the match; scalars are returned as is
    pub fn html(&self) -> String {
        match self {
            XPathMatch::Node(node) => node.outer_html(),
            XPathMatch::Attribute { name, value } => {
                format!("{}=\"{}\"", name, escape_attr(value))
            }
            XPathMatch::Value(s) => s.clone(),
        }
    }
}

impl XPath {
    /// Compile an expression
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source).map_err(|reason| Error::xpath(source, reason))?;
        let expr = Parser {
            tokens,
            pos: 0,
            source,
        }
        .parse()?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The expression text this was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a document, with the document node as context
    pub fn evaluate(&self, doc: &Document) -> Vec<XPathMatch> {
        let nodes = doc.nodes.read();
        let evaluator = Evaluator { nodes: &nodes };
        let ctx = Context {
            node: XNode::Node(doc.root_id()),
            position: 1,
            size: 1,
        };

        match evaluator.eval(&self.expr, ctx) {
            Value::Nodes(set) => set
                .into_iter()
                .map(|n| match n {
                    XNode::Node(id) => XPathMatch::Node(Node::new(id, doc.nodes.clone())),
                    XNode::Attr(owner, index) => {
                        let (name, value) = nodes
                            .get(&owner)
                            .and_then(|d| d.attributes.get(index))
                            .cloned()
                            .unwrap_or_default();
                        XPathMatch::Attribute { name, value }
                    }
                })
                .collect(),
            other => vec![XPathMatch::Value(evaluator.to_string(&other))],
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    At,
    Comma,
    Pipe,
    Dot,
    DotDot,
    DoubleColon,
    Star,
    Plus,
    Minus,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Literal(String),
    Number(f64),
    Name(String),
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let (token, width) = match c {
            '/' if next == Some('/') => (Token::DoubleSlash, 2),
            '/' => (Token::Slash, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '@' => (Token::At, 1),
            ',' => (Token::Comma, 1),
            '|' => (Token::Pipe, 1),
            '*' => (Token::Star, 1),
            '+' => (Token::Plus, 1),
            '-' => (Token::Minus, 1),
            '=' => (Token::Eq, 1),
            '!' if next == Some('=') => (Token::NotEq, 2),
            '<' if next == Some('=') => (Token::LtEq, 2),
            '<' => (Token::Lt, 1),
            '>' if next == Some('=') => (Token::GtEq, 2),
            '>' => (Token::Gt, 1),
            ':' if next == Some(':') => (Token::DoubleColon, 2),
            '.' if next == Some('.') => (Token::DotDot, 2),
            '.' if next.map_or(false, |n| n.is_ascii_digit()) => read_number(&chars, i)?,
            '.' => (Token::Dot, 1),
            '"' | '\'' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| "unterminated string literal".to_string())?;
                let literal: String = chars[i + 1..i + 1 + end].iter().collect();
                (Token::Literal(literal), end + 2)
            }
            c if c.is_ascii_digit() => read_number(&chars, i)?,
            c if c.is_alphabetic() || c == '_' => read_name(&chars, i),
            other => return Err(format!("unexpected character '{}'", other)),
        };

        tokens.push(token);
        i += width;
    }

    Ok(tokens)
}

fn read_number(chars: &[char], start: usize) -> std::result::Result<(Token, usize), String> {
    let mut end = start;
    let mut seen_dot = false;
    while let Some(&c) = chars.get(end) {
        if c.is_ascii_digit() {
            end += 1;
        } else if c == '.' && !seen_dot {
            seen_dot = true;
            end += 1;
        } else {
            break;
        }
    }
    let text: String = chars[start..end].iter().collect();
    let value = text
        .parse::<f64>()
        .map_err(|_| format!("invalid number '{}'", text))?;
    Ok((Token::Number(value), end - start))
}

fn read_name(chars: &[char], start: usize) -> (Token, usize) {
    let mut end = start;
    while let Some(&c) = chars.get(end) {
        let prefix_colon = c == ':'
            && chars
                .get(end + 1)
                .map_or(false, |n| n.is_alphabetic() || *n == '_');
        if c.is_alphanumeric() || c == '_' || c == '-' || c == '.' || prefix_colon {
            end += 1;
        } else {
            break;
        }
    }
    (Token::Name(chars[start..end].iter().collect()), end - start)
}

// ---------------------------------------------------------------------------
// Syntax tree

#[derive(Debug, Clone)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(CmpOp, Box<Expr>, Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Path { absolute: bool, steps: Vec<Step> },
    Filter {
        primary: Box<Expr>,
        predicates: Vec<Expr>,
        steps: Vec<Step>,
    },
    Literal(String),
    Number(f64),
    Call(String, Vec<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

#[derive(Debug, Clone)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Expr>,
}

impl Step {
    fn descendant_or_self() -> Self {
        Self {
            axis: Axis::DescendantOrSelf,
            test: NodeTest::Node,
            predicates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    SelfAxis,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Attribute,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Axis::Child,
            "descendant" => Axis::Descendant,
            "descendant-or-self" => Axis::DescendantOrSelf,
            "self" => Axis::SelfAxis,
            "parent" => Axis::Parent,
            "ancestor" => Axis::Ancestor,
            "ancestor-or-self" => Axis::AncestorOrSelf,
            "following-sibling" => Axis::FollowingSibling,
            "preceding-sibling" => Axis::PrecedingSibling,
            "attribute" => Axis::Attribute,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
enum NodeTest {
    /// Named element, or named attribute on the attribute axis
    Name(String),
    /// `*`
    Any,
    Text,
    Comment,
    Node,
}

/// Known functions with their minimum and maximum argument counts
const FUNCTIONS: &[(&str, usize, Option<usize>)] = &[
    ("last", 0, Some(0)),
    ("position", 0, Some(0)),
    ("count", 1, Some(1)),
    ("contains", 2, Some(2)),
    ("starts-with", 2, Some(2)),
    ("concat", 2, None),
    ("normalize-space", 0, Some(1)),
    ("string", 0, Some(1)),
    ("string-length", 0, Some(1)),
    ("substring", 2, Some(3)),
    ("substring-before", 2, Some(2)),
    ("substring-after", 2, Some(2)),
    ("not", 1, Some(1)),
    ("true", 0, Some(0)),
    ("false", 0, Some(0)),
    ("boolean", 1, Some(1)),
    ("number", 0, Some(1)),
    ("name", 0, Some(1)),
    ("local-name", 0, Some(1)),
];

const NODE_TYPE_TESTS: [&str; 3] = ["text", "node", "comment"];

// ---------------------------------------------------------------------------
// Parser

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn parse(mut self) -> Result<Expr> {
        let expr = self.parse_or()?;
        if let Some(token) = self.peek() {
            return Err(self.error(format!("unexpected token {:?}", token)));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        match self.advance() {
            Some(ref t) if *t == expected => Ok(()),
            Some(t) => Err(self.error(format!("expected {:?}, found {:?}", expected, t))),
            None => Err(self.error(format!("expected {:?}, found end of input", expected))),
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::xpath(self.source, reason)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(n)) if n == keyword)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.at_keyword("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_equality()?;
        while self.at_keyword("and") {
            self.advance();
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CmpOp::Eq,
                Some(Token::NotEq) => CmpOp::NotEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::LtEq) => CmpOp::LtEq,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::GtEq) => CmpOp::GtEq,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    let right = self.parse_unary()?;
                    left = Expr::Add(Box::new(left), Box::new(right));
                }
                Some(Token::Minus) => {
                    self.advance();
                    let right = self.parse_unary()?;
                    left = Expr::Sub(Box::new(left), Box::new(right));
                }
                _ => return Ok(left),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.peek() == Some(&Token::Minus) {
            self.advance();
            return Ok(Expr::Neg(Box::new(self.parse_unary()?)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr> {
        let mut left = self.parse_path()?;
        while self.peek() == Some(&Token::Pipe) {
            self.advance();
            let right = self.parse_path()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_path(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Slash) => {
                self.advance();
                let steps = if self.starts_step() {
                    self.parse_relative()?
                } else {
                    Vec::new()
                };
                Ok(Expr::Path {
                    absolute: true,
                    steps,
                })
            }
            Some(Token::DoubleSlash) => {
                self.advance();
                let mut steps = vec![Step::descendant_or_self()];
                steps.extend(self.parse_relative()?);
                Ok(Expr::Path {
                    absolute: true,
                    steps,
                })
            }
            _ if self.starts_primary() => self.parse_filter(),
            _ => Ok(Expr::Path {
                absolute: false,
                steps: self.parse_relative()?,
            }),
        }
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Dot | Token::DotDot | Token::At | Token::Star | Token::Name(_))
        )
    }

    fn starts_primary(&self) -> bool {
        match self.peek() {
            Some(Token::LParen | Token::Literal(_) | Token::Number(_)) => true,
            Some(Token::Name(name)) => {
                self.peek_at(1) == Some(&Token::LParen)
                    && !NODE_TYPE_TESTS.contains(&name.as_str())
            }
            _ => false,
        }
    }

    fn parse_filter(&mut self) -> Result<Expr> {
        let primary = self.parse_primary()?;
        let predicates = self.parse_predicates()?;
        let mut steps = Vec::new();
        match self.peek() {
            Some(Token::Slash) => {
                self.advance();
                steps = self.parse_relative()?;
            }
            Some(Token::DoubleSlash) => {
                self.advance();
                steps.push(Step::descendant_or_self());
                steps.extend(self.parse_relative()?);
            }
            _ => {}
        }

        if predicates.is_empty() && steps.is_empty() {
            return Ok(primary);
        }
        Ok(Expr::Filter {
            primary: Box::new(primary),
            predicates,
            steps,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.advance() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Literal(s)) => Ok(Expr::Literal(s)),
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Name(name)) => self.parse_call(name),
            other => Err(self.error(format!("expected expression, found {:?}", other))),
        }
    }

    fn parse_call(&mut self, name: String) -> Result<Expr> {
        let (min, max) = FUNCTIONS
            .iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, min, max)| (*min, *max))
            .ok_or_else(|| self.error(format!("unknown function '{}'", name)))?;

        self.expect(Token::LParen)?;
        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            args.push(self.parse_or()?);
            while self.peek() == Some(&Token::Comma) {
                self.advance();
                args.push(self.parse_or()?);
            }
        }
        self.expect(Token::RParen)?;

        if args.len() < min || max.map_or(false, |max| args.len() > max) {
            return Err(self.error(format!(
                "wrong number of arguments to {}(): {}",
                name,
                args.len()
            )));
        }
        Ok(Expr::Call(name, args))
    }

    fn parse_relative(&mut self) -> Result<Vec<Step>> {
        let mut steps = vec![self.parse_step()?];
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.advance();
                    steps.push(self.parse_step()?);
                }
                Some(Token::DoubleSlash) => {
                    self.advance();
                    steps.push(Step::descendant_or_self());
                    steps.push(self.parse_step()?);
                }
                _ => return Ok(steps),
            }
        }
    }

    fn parse_step(&mut self) -> Result<Step> {
        let (axis, test) = match self.peek() {
            Some(Token::Dot) => {
                self.advance();
                (Axis::SelfAxis, NodeTest::Node)
            }
            Some(Token::DotDot) => {
                self.advance();
                (Axis::Parent, NodeTest::Node)
            }
            Some(Token::At) => {
                self.advance();
                (Axis::Attribute, self.parse_node_test()?)
            }
            Some(Token::Name(name)) if self.peek_at(1) == Some(&Token::DoubleColon) => {
                let axis = Axis::from_name(name)
                    .ok_or_else(|| self.error(format!("unsupported axis '{}'", name)))?;
                self.advance();
                self.advance();
                (axis, self.parse_node_test()?)
            }
            _ => (Axis::Child, self.parse_node_test()?),
        };

        Ok(Step {
            axis,
            test,
            predicates: self.parse_predicates()?,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest> {
        match self.advance() {
            Some(Token::Star) => Ok(NodeTest::Any),
            Some(Token::Name(name)) => {
                if self.peek() == Some(&Token::LParen)
                    && NODE_TYPE_TESTS.contains(&name.as_str())
                {
                    self.advance();
                    self.expect(Token::RParen)?;
                    return Ok(match name.as_str() {
                        "text" => NodeTest::Text,
                        "comment" => NodeTest::Comment,
                        _ => NodeTest::Node,
                    });
                }
                Ok(NodeTest::Name(name))
            }
            Some(other) => Err(self.error(format!("expected node test, found {:?}", other))),
            None => Err(self.error("expected node test, found end of input")),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>> {
        let mut predicates = Vec::new();
        while self.peek() == Some(&Token::LBracket) {
            self.advance();
            predicates.push(self.parse_or()?);
            self.expect(Token::RBracket)?;
        }
        Ok(predicates)
    }
}

// ---------------------------------------------------------------------------
// Evaluation

/// A node as seen by XPath. Attributes are addressed by owner and index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum XNode {
    Node(NodeId),
    Attr(NodeId, usize),
}

impl XNode {
    /// Attributes sort after their owner and before its children
    fn order_key(&self) -> (NodeId, usize) {
        match *self {
            XNode::Node(id) => (id, 0),
            XNode::Attr(id, index) => (id, index + 1),
        }
    }
}

#[derive(Debug, Clone)]
enum Value {
    Nodes(Vec<XNode>),
    Str(String),
    Num(f64),
    Bool(bool),
}

#[derive(Debug, Clone, Copy)]
struct Context {
    node: XNode,
    position: usize,
    size: usize,
}

struct Evaluator<'a> {
    nodes: &'a HashMap<NodeId, NodeData>,
}

fn document_order(mut set: Vec<XNode>) -> Vec<XNode> {
    set.sort_by_key(XNode::order_key);
    set.dedup();
    set
}

impl<'a> Evaluator<'a> {
    fn eval(&self, expr: &Expr, ctx: Context) -> Value {
        match expr {
            Expr::Or(l, r) => {
                Value::Bool(self.to_bool(&self.eval(l, ctx)) || self.to_bool(&self.eval(r, ctx)))
            }
            Expr::And(l, r) => {
                Value::Bool(self.to_bool(&self.eval(l, ctx)) && self.to_bool(&self.eval(r, ctx)))
            }
            Expr::Compare(op, l, r) => {
                Value::Bool(self.compare(*op, &self.eval(l, ctx), &self.eval(r, ctx)))
            }
            Expr::Add(l, r) => {
                Value::Num(self.to_number(&self.eval(l, ctx)) + self.to_number(&self.eval(r, ctx)))
            }
            Expr::Sub(l, r) => {
                Value::Num(self.to_number(&self.eval(l, ctx)) - self.to_number(&self.eval(r, ctx)))
            }
            Expr::Neg(inner) => Value::Num(-self.to_number(&self.eval(inner, ctx))),
            Expr::Union(l, r) => match (self.eval(l, ctx), self.eval(r, ctx)) {
                (Value::Nodes(mut a), Value::Nodes(b)) => {
                    a.extend(b);
                    Value::Nodes(document_order(a))
                }
                _ => Value::Nodes(Vec::new()),
            },
            Expr::Path { absolute, steps } => {
                let start = if *absolute {
                    vec![XNode::Node(self.root_of(ctx.node))]
                } else {
                    vec![ctx.node]
                };
                Value::Nodes(self.apply_steps(start, steps))
            }
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let Value::Nodes(set) = self.eval(primary, ctx) else {
                    return Value::Nodes(Vec::new());
                };
                let filtered = self.filter(set, predicates);
                Value::Nodes(self.apply_steps(filtered, steps))
            }
            Expr::Literal(s) => Value::Str(s.clone()),
            Expr::Number(n) => Value::Num(*n),
            Expr::Call(name, args) => self.call(name, args, ctx),
        }
    }

    fn root_of(&self, node: XNode) -> NodeId {
        let mut id = match node {
            XNode::Node(id) | XNode::Attr(id, _) => id,
        };
        while let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) {
            id = parent;
        }
        id
    }

    fn apply_steps(&self, start: Vec<XNode>, steps: &[Step]) -> Vec<XNode> {
        let mut current = start;
        for step in steps {
            let mut next = Vec::new();
            for &node in &current {
                let candidates: Vec<XNode> = self
                    .axis_nodes(node, step.axis)
                    .into_iter()
                    .filter(|&n| self.node_test(n, step.axis, &step.test))
                    .collect();
                next.extend(self.filter(candidates, &step.predicates));
            }
            current = document_order(next);
        }
        current
    }

    /// Apply predicates in turn; positions follow the order of `set`
    fn filter(&self, mut set: Vec<XNode>, predicates: &[Expr]) -> Vec<XNode> {
        for predicate in predicates {
            let size = set.len();
            set = set
                .into_iter()
                .enumerate()
                .filter(|&(i, node)| {
                    let ctx = Context {
                        node,
                        position: i + 1,
                        size,
                    };
                    match self.eval(predicate, ctx) {
                        Value::Num(n) => n == ctx.position as f64,
                        other => self.to_bool(&other),
                    }
                })
                .map(|(_, node)| node)
                .collect();
        }
        set
    }

    /// Nodes along an axis, nearest first for reverse axes
    fn axis_nodes(&self, node: XNode, axis: Axis) -> Vec<XNode> {
        let id = match node {
            XNode::Attr(owner, _) => {
                return match axis {
                    Axis::SelfAxis => vec![node],
                    Axis::Parent => vec![XNode::Node(owner)],
                    Axis::Ancestor | Axis::AncestorOrSelf => {
                        let mut out = Vec::new();
                        if axis == Axis::AncestorOrSelf {
                            out.push(node);
                        }
                        out.push(XNode::Node(owner));
                        out.extend(self.ancestors(owner));
                        out
                    }
                    _ => Vec::new(),
                };
            }
            XNode::Node(id) => id,
        };
        let Some(data) = self.nodes.get(&id) else {
            return Vec::new();
        };

        match axis {
            Axis::Child => data.children.iter().map(|&c| XNode::Node(c)).collect(),
            Axis::Descendant => {
                let mut out = Vec::new();
                self.push_descendants(id, &mut out);
                out
            }
            Axis::DescendantOrSelf => {
                let mut out = vec![node];
                self.push_descendants(id, &mut out);
                out
            }
            Axis::SelfAxis => vec![node],
            Axis::Parent => data.parent.map(XNode::Node).into_iter().collect(),
            Axis::Ancestor => self.ancestors(id),
            Axis::AncestorOrSelf => {
                let mut out = vec![node];
                out.extend(self.ancestors(id));
                out
            }
            Axis::FollowingSibling | Axis::PrecedingSibling => {
                let siblings = data
                    .parent
                    .and_then(|p| self.nodes.get(&p))
                    .map(|p| p.children.as_slice())
                    .unwrap_or(&[]);
                let Some(index) = siblings.iter().position(|&s| s == id) else {
                    return Vec::new();
                };
                if axis == Axis::FollowingSibling {
                    siblings[index + 1..].iter().map(|&s| XNode::Node(s)).collect()
                } else {
                    siblings[..index].iter().rev().map(|&s| XNode::Node(s)).collect()
                }
            }
            Axis::Attribute => (0..data.attributes.len())
                .map(|i| XNode::Attr(id, i))
                .collect(),
        }
    }

    /// Preorder walk with an explicit stack
    fn push_descendants(&self, id: NodeId, out: &mut Vec<XNode>) {
        let children = |id: NodeId| {
            self.nodes
                .get(&id)
                .map(|d| d.children.as_slice())
                .unwrap_or(&[])
        };
        let mut stack: Vec<NodeId> = children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(XNode::Node(next));
            stack.extend(children(next).iter().rev().copied());
        }
    }

    fn ancestors(&self, id: NodeId) -> Vec<XNode> {
        let mut out = Vec::new();
        let mut current = self.nodes.get(&id).and_then(|n| n.parent);
        while let Some(parent) = current {
            out.push(XNode::Node(parent));
            current = self.nodes.get(&parent).and_then(|n| n.parent);
        }
        out
    }

    fn node_test(&self, node: XNode, axis: Axis, test: &NodeTest) -> bool {
        let attribute_axis = axis == Axis::Attribute;
        match node {
            XNode::Attr(owner, index) => match test {
                NodeTest::Node => true,
                NodeTest::Any => attribute_axis,
                NodeTest::Name(name) => {
                    attribute_axis
                        && self
                            .nodes
                            .get(&owner)
                            .and_then(|d| d.attributes.get(index))
                            .map_or(false, |(n, _)| n.eq_ignore_ascii_case(name))
                }
                NodeTest::Text | NodeTest::Comment => false,
            },
            XNode::Node(id) => {
                let Some(data) = self.nodes.get(&id) else {
                    return false;
                };
                match test {
                    NodeTest::Node => true,
                    NodeTest::Text => data.node_type == NodeType::Text,
                    NodeTest::Comment => data.node_type == NodeType::Comment,
                    NodeTest::Any => !attribute_axis && data.node_type == NodeType::Element,
                    NodeTest::Name(name) => {
                        !attribute_axis
                            && data
                                .tag_name
                                .as_deref()
                                .map_or(false, |t| t.eq_ignore_ascii_case(name))
                    }
                }
            }
        }
    }

    fn string_value(&self, node: XNode) -> String {
        match node {
            XNode::Node(id) => string_value(self.nodes, id),
            XNode::Attr(owner, index) => self
                .nodes
                .get(&owner)
                .and_then(|d| d.attributes.get(index))
                .map(|(_, v)| v.clone())
                .unwrap_or_default(),
        }
    }

    fn node_name(&self, node: XNode) -> String {
        match node {
            XNode::Node(id) => self
                .nodes
                .get(&id)
                .and_then(|d| d.tag_name.clone())
                .unwrap_or_default(),
            XNode::Attr(owner, index) => self
                .nodes
                .get(&owner)
                .and_then(|d| d.attributes.get(index))
                .map(|(n, _)| n.clone())
                .unwrap_or_default(),
        }
    }

    fn to_string(&self, value: &Value) -> String {
        match value {
            Value::Nodes(set) => set
                .first()
                .map(|&n| self.string_value(n))
                .unwrap_or_default(),
            Value::Str(s) => s.clone(),
            Value::Num(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
        }
    }

    fn to_number(&self, value: &Value) -> f64 {
        match value {
            Value::Num(n) => *n,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            other => parse_number(&self.to_string(other)),
        }
    }

    fn to_bool(&self, value: &Value) -> bool {
        match value {
            Value::Nodes(set) => !set.is_empty(),
            Value::Str(s) => !s.is_empty(),
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
        }
    }

    fn compare(&self, op: CmpOp, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Nodes(a), Value::Nodes(b)) => a.iter().any(|&x| {
                let sx = Value::Str(self.string_value(x));
                b.iter()
                    .any(|&y| self.compare_atoms(op, &sx, &Value::Str(self.string_value(y))))
            }),
            (Value::Nodes(set), other) => self.compare_set(op, set, other, false),
            (other, Value::Nodes(set)) => self.compare_set(op, set, other, true),
            _ => self.compare_atoms(op, left, right),
        }
    }

    /// A node-set compares true when any member does; booleans compare
    /// against the set's emptiness
    fn compare_set(&self, op: CmpOp, set: &[XNode], other: &Value, set_on_right: bool) -> bool {
        let ordered = |a: &Value, b: &Value| {
            if set_on_right {
                self.compare_atoms(op, b, a)
            } else {
                self.compare_atoms(op, a, b)
            }
        };
        if let Value::Bool(_) = other {
            return ordered(&Value::Bool(!set.is_empty()), other);
        }
        set.iter()
            .any(|&n| ordered(&Value::Str(self.string_value(n)), other))
    }

    fn compare_atoms(&self, op: CmpOp, left: &Value, right: &Value) -> bool {
        match op {
            CmpOp::Eq | CmpOp::NotEq => {
                let equal = if matches!(left, Value::Bool(_)) || matches!(right, Value::Bool(_)) {
                    self.to_bool(left) == self.to_bool(right)
                } else if matches!(left, Value::Num(_)) || matches!(right, Value::Num(_)) {
                    self.to_number(left) == self.to_number(right)
                } else {
                    self.to_string(left) == self.to_string(right)
                };
                (op == CmpOp::Eq) == equal
            }
            CmpOp::Lt => self.to_number(left) < self.to_number(right),
            CmpOp::LtEq => self.to_number(left) <= self.to_number(right),
            CmpOp::Gt => self.to_number(left) > self.to_number(right),
            CmpOp::GtEq => self.to_number(left) >= self.to_number(right),
        }
    }

    /// String argument `i`, or the context node's string value when absent
    fn string_arg(&self, args: &[Expr], i: usize, ctx: Context) -> String {
        match args.get(i) {
            Some(arg) => self.to_string(&self.eval(arg, ctx)),
            None => self.string_value(ctx.node),
        }
    }

    fn call(&self, name: &str, args: &[Expr], ctx: Context) -> Value {
        match name {
            "last" => Value::Num(ctx.size as f64),
            "position" => Value::Num(ctx.position as f64),
            "count" => match self.eval(&args[0], ctx) {
                Value::Nodes(set) => Value::Num(set.len() as f64),
                _ => Value::Num(0.0),
            },
            "contains" => {
                let haystack = self.string_arg(args, 0, ctx);
                Value::Bool(haystack.contains(&self.string_arg(args, 1, ctx)))
            }
            "starts-with" => {
                let haystack = self.string_arg(args, 0, ctx);
                Value::Bool(haystack.starts_with(&self.string_arg(args, 1, ctx)))
            }
            "concat" => Value::Str(
                (0..args.len())
                    .map(|i| self.string_arg(args, i, ctx))
                    .collect(),
            ),
            "normalize-space" => Value::Str(
                self.string_arg(args, 0, ctx)
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            "string" => Value::Str(self.string_arg(args, 0, ctx)),
            "string-length" => Value::Num(self.string_arg(args, 0, ctx).chars().count() as f64),
            "substring" => {
                let s = self.string_arg(args, 0, ctx);
                let start = round(self.to_number(&self.eval(&args[1], ctx)));
                let end = match args.get(2) {
                    Some(len) => start + round(self.to_number(&self.eval(len, ctx))),
                    None => f64::INFINITY,
                };
                Value::Str(
                    s.chars()
                        .enumerate()
                        .filter(|(i, _)| {
                            let p = (*i + 1) as f64;
                            p >= start && p < end
                        })
                        .map(|(_, c)| c)
                        .collect(),
                )
            }
            "substring-before" => {
                let s = self.string_arg(args, 0, ctx);
                let needle = self.string_arg(args, 1, ctx);
                Value::Str(
                    s.split_once(needle.as_str())
                        .map(|(before, _)| before.to_string())
                        .unwrap_or_default(),
                )
            }
            "substring-after" => {
                let s = self.string_arg(args, 0, ctx);
                let needle = self.string_arg(args, 1, ctx);
                Value::Str(
                    s.split_once(needle.as_str())
                        .map(|(_, after)| after.to_string())
                        .unwrap_or_default(),
                )
            }
            "not" => Value::Bool(!self.to_bool(&self.eval(&args[0], ctx))),
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "boolean" => Value::Bool(self.to_bool(&self.eval(&args[0], ctx))),
            "number" => Value::Num(parse_number(&self.string_arg(args, 0, ctx))),
            "name" | "local-name" => {
                let target = match args.first() {
                    Some(arg) => match self.eval(arg, ctx) {
                        Value::Nodes(set) => set.first().copied(),
                        _ => None,
                    },
                    None => Some(ctx.node),
                };
                Value::Str(target.map(|n| self.node_name(n)).unwrap_or_default())
            }
            _ => Value::Nodes(Vec::new()),
        }
    }
}

fn round(n: f64) -> f64 {
    (n + 0.5).floor()
}

fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let valid = !digits.is_empty()
        && digits != "."
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if valid {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    const PAGE: &str = r#"<html><body>
<div id="main" class="box wide">
  <h1>Title</h1>
  <ul>
    <li class="item">One</li>
    <li class="item special">Two</li>
    <li>Three</li>
  </ul>
  <a href="/a">First</a><a href="/b">Second</a>
  <span>  spaced   out  </span>
  <!-- note -->
</div>
<p>3</p><p>10</p>
</body></html>"#;

    fn texts(expr: &str) -> Vec<String> {
        parse_html(PAGE)
            .xpath(expr)
            .unwrap()
            .iter()
            .map(XPathMatch::text)
            .collect()
    }

    fn scalar(expr: &str) -> String {
        let matches = parse_html(PAGE).xpath(expr).unwrap();
        assert_eq!(matches.len(), 1, "{} should yield one value", expr);
        match &matches[0] {
            XPathMatch::Value(v) => v.clone(),
            other => panic!("expected a scalar, got {:?}", other),
        }
    }

    #[test]
    fn test_descendant_and_child_paths() {
        assert_eq!(texts("//li"), vec!["One", "Two", "Three"]);
        assert_eq!(texts("/html/body/div/h1"), vec!["Title"]);
        assert_eq!(texts("//*[@id='main']/h1"), vec!["Title"]);
        assert_eq!(texts("//div//li[2]"), vec!["Two"]);
        assert_eq!(texts("//h1/text()"), vec!["Title"]);
    }

    #[test]
    fn test_positional_predicates() {
        assert_eq!(texts("//li[1]"), vec!["One"]);
        assert_eq!(texts("//li[last()]"), vec!["Three"]);
        assert_eq!(texts("(//a | //li)[2]"), vec!["Two"]);
        assert_eq!(texts("//li[position() > 1 and @class]"), vec!["Two"]);
        assert_eq!(texts("//a[1]"), vec!["First"]);
    }

    #[test]
    fn test_attribute_predicates_and_values() {
        assert_eq!(texts("//li[@class]"), vec!["One", "Two"]);
        assert_eq!(texts("//li[not(@class)]"), vec!["Three"]);
        assert_eq!(texts("//li[contains(@class, 'special')]"), vec!["Two"]);
        assert_eq!(texts("//li[@class='item' or . = 'Three']"), vec!["One", "Three"]);
        assert_eq!(texts("//a/@href"), vec!["/a", "/b"]);

        let doc = parse_html(PAGE);
        let attr = &doc.xpath("//a[2]/@href").unwrap()[0];
        assert_eq!(attr.html(), "href=\"/b\"");
    }

    #[test]
    fn test_axes() {
        assert_eq!(texts("//li[.='Two']/preceding-sibling::li"), vec!["One"]);
        assert_eq!(texts("//li[1]/following-sibling::li[1]"), vec!["Two"]);
        assert_eq!(texts("//li[3]/preceding-sibling::li[1]"), vec!["Two"]);
        assert_eq!(texts("//h1/../ul/li[3]"), vec!["Three"]);
        assert_eq!(texts("//a/@href/.."), vec!["First", "Second"]);

        assert_eq!(texts("//li[3]/ancestor::*[@id]/@id"), vec!["main"]);
        let doc = parse_html(PAGE);
        assert_eq!(doc.xpath("//li/ancestor-or-self::ul").unwrap().len(), 1);
        assert_eq!(doc.xpath("//ul/descendant::li").unwrap().len(), 3);
        assert_eq!(doc.xpath("//ul/child::li/self::li").unwrap().len(), 3);
    }

    #[test]
    fn test_union_is_document_ordered() {
        assert_eq!(texts("//p | //h1"), vec!["Title", "3", "10"]);
        assert_eq!(texts("//h1 | //p | //h1"), vec!["Title", "3", "10"]);
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(texts("//p[. > 5]"), vec!["10"]);
        assert_eq!(texts("//p[. != 3]"), vec!["10"]);
        assert_eq!(texts("//p[number(.) <= 3]"), vec!["3"]);
        assert_eq!(texts("//li[starts-with(., 'T')]"), vec!["Two", "Three"]);
    }

    #[test]
    fn test_scalar_results() {
        assert_eq!(scalar("count(//li)"), "3");
        assert_eq!(scalar("normalize-space(//span)"), "spaced out");
        assert_eq!(scalar("string-length(//h1)"), "5");
        assert_eq!(scalar("concat(//h1, '!')"), "Title!");
        assert_eq!(scalar("name(//ul/*[1])"), "li");
        assert_eq!(scalar("-count(//p) + 1"), "-1");
        assert_eq!(scalar("substring(//h1, 2, 3)"), "itl");
        assert_eq!(scalar("substring-after(//a[1]/@href, '/')"), "a");
        assert_eq!(scalar("count(//li) = 3"), "true");
        assert_eq!(scalar("//nope = 'x'"), "false");
        assert_eq!(scalar("number('abc')"), "NaN");
    }

    #[test]
    fn test_comments_and_node_tests() {
        assert_eq!(texts("//comment()"), vec![" note "]);
        let doc = parse_html(PAGE);
        assert_eq!(doc.xpath("//ul/*").unwrap().len(), 3);
        assert!(doc.xpath("//ul/node()").unwrap().len() > 3);
    }

    #[test]
    fn test_outer_html() {
        let doc = parse_html(PAGE);
        let li = &doc.xpath("//li[2]").unwrap()[0];
        assert_eq!(li.html(), "<li class=\"item special\">Two</li>");
    }

    #[test]
    fn test_root_path() {
        let doc = parse_html(PAGE);
        let root = doc.xpath("/").unwrap();
        assert_eq!(root.len(), 1);
        assert!(root[0].text().contains("Title"));
    }

    #[test]
    fn test_no_match_is_empty() {
        assert!(texts("//table/tr").is_empty());
        assert!(texts("//li[@class='none']").is_empty());
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            "",
            "//li[",
            "//li[@x='a]",
            "foo()",
            "bogus::li",
            "//li)",
            "count()",
            "//li[#]",
        ] {
            let err = XPath::parse(bad).unwrap_err();
            assert!(matches!(err, Error::XPath { .. }), "{:?} should fail", bad);
        }
    }

    #[test]
    fn test_source_kept() {
        let xpath = XPath::parse("//a/@href").unwrap();
        assert_eq!(xpath.source(), "//a/@href");
    }
}
