//! Turtle reading and writing
//!
//! The parser covers the parts of Turtle that shape files and our own output
//! use: `@prefix`/`PREFIX`, `@base`/`BASE`, prefixed names, the `a` keyword,
//! `;` and `,` lists, `[ ... ]` blank node property lists, `( ... )`
//! collections, `_:` labels, typed and language-tagged literals (including
//! long `"""` strings), and numeric and boolean shorthand.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::vocab::{rdf, xsd};
use super::{Graph, Literal, Term};
use crate::error::RepoqError;

/// Escape a string for a short double-quoted Turtle literal.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

fn is_simple_local(local: &str) -> bool {
    !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !local.starts_with('-')
}

fn looks_like_integer(s: &str) -> bool {
    let digits = s.strip_prefix(&['+', '-'][..]).unwrap_or(s);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn looks_like_decimal(s: &str) -> bool {
    let body = s.strip_prefix(&['+', '-'][..]).unwrap_or(s);
    match body.split_once('.') {
        Some((int, frac)) => {
            int.chars().all(|c| c.is_ascii_digit())
                && !frac.is_empty()
                && frac.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

struct Writer<'a> {
    prefixes: &'a BTreeMap<String, String>,
}

impl Writer<'_> {
    fn iri(&self, iri: &str) -> String {
        if iri == rdf::NIL {
            return "()".to_string();
        }
        for (prefix, ns) in self.prefixes {
            if let Some(local) = iri.strip_prefix(ns.as_str()) {
                if is_simple_local(local) {
                    return format!("{}:{}", prefix, local);
                }
            }
        }
        format!("<{}>", iri)
    }

    fn term(&self, term: &Term) -> String {
        match term {
            Term::Iri(iri) => self.iri(iri),
            Term::Blank(label) => format!("_:{}", label),
            Term::Literal(lit) => self.literal(lit),
        }
    }

    fn literal(&self, lit: &Literal) -> String {
        if let Some(lang) = &lit.lang {
            return format!("\"{}\"@{}", escape_string(&lit.lexical), lang);
        }
        match lit.datatype.as_str() {
            xsd::STRING => format!("\"{}\"", escape_string(&lit.lexical)),
            xsd::INTEGER if looks_like_integer(&lit.lexical) => lit.lexical.clone(),
            xsd::DECIMAL if looks_like_decimal(&lit.lexical) => lit.lexical.clone(),
            xsd::BOOLEAN if lit.lexical == "true" || lit.lexical == "false" => {
                lit.lexical.clone()
            }
            dt => format!("\"{}\"^^{}", escape_string(&lit.lexical), self.iri(dt)),
        }
    }
}

/// Serialize a graph as Turtle, grouped by subject, `rdf:type` first.
pub fn write_turtle(graph: &Graph) -> String {
    let writer = Writer {
        prefixes: graph.prefixes(),
    };
    let mut out = String::new();
    for (prefix, ns) in graph.prefixes() {
        let _ = writeln!(out, "@prefix {}: <{}> .", prefix, ns);
    }
    if !graph.prefixes().is_empty() {
        out.push('\n');
    }

    let type_pred = Term::iri(rdf::TYPE);
    for subject in graph.subjects_all() {
        let mut lines: Vec<String> = Vec::new();
        let types: Vec<String> = graph
            .objects(subject, &type_pred)
            .map(|t| writer.term(t))
            .collect();
        if !types.is_empty() {
            lines.push(format!("a {}", types.join(", ")));
        }

        let mut grouped: BTreeMap<&Term, Vec<String>> = BTreeMap::new();
        for (p, o) in graph.properties(subject) {
            if *p != type_pred {
                grouped.entry(p).or_default().push(writer.term(o));
            }
        }
        for (p, objects) in grouped {
            lines.push(format!("{} {}", writer.term(p), objects.join(", ")));
        }

        let _ = writeln!(
            out,
            "{} {} .\n",
            writer.term(subject),
            lines.join(" ;\n    ")
        );
    }
    out
}

/// Parse a Turtle document into a new graph.
pub fn parse_turtle(text: &str, source_name: &str) -> Result<Graph, RepoqError> {
    let mut graph = Graph::new();
    parse_turtle_into(&mut graph, text, source_name)?;
    Ok(graph)
}

/// Parse a Turtle document, adding its triples to `graph`.
///
/// Blank node labels are scoped to this document.
pub fn parse_turtle_into(graph: &mut Graph, text: &str, source_name: &str) -> Result<(), RepoqError> {
    let mut parser = Parser {
        chars: text.chars().collect(),
        pos: 0,
        line: 1,
        column: 1,
        source_name,
        prefixes: BTreeMap::new(),
        base: None,
        labels: BTreeMap::new(),
        graph,
    };
    parser.document()
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    source_name: &'a str,
    prefixes: BTreeMap<String, String>,
    base: Option<String>,
    labels: BTreeMap<String, Term>,
    graph: &'a mut Graph,
}

type ParseResult<T> = Result<T, RepoqError>;

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.' || c == '\u{b7}'
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> RepoqError {
        RepoqError::TurtleParse {
            source_name: self.source_name.to_string(),
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> ParseResult<()> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    /// Case-insensitive keyword match followed by a non-name character.
    fn at_keyword(&self, keyword: &str) -> bool {
        let n = keyword.chars().count();
        let matches = keyword
            .chars()
            .enumerate()
            .all(|(i, k)| self.peek_at(i).map(|c| c.eq_ignore_ascii_case(&k)).unwrap_or(false));
        matches
            && !self
                .peek_at(n)
                .map(|c| is_name_char(c) || c == ':')
                .unwrap_or(false)
    }

    fn consume(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    fn document(&mut self) -> ParseResult<()> {
        loop {
            self.skip_ws();
            if self.peek().is_none() {
                return Ok(());
            }
            if self.at_keyword("@prefix") {
                self.consume(7);
                self.prefix_decl()?;
                self.expect('.')?;
            } else if self.at_keyword("@base") {
                self.consume(5);
                self.base_decl()?;
                self.expect('.')?;
            } else if self.at_keyword("prefix") {
                self.consume(6);
                self.prefix_decl()?;
            } else if self.at_keyword("base") {
                self.consume(4);
                self.base_decl()?;
            } else {
                self.triples()?;
                self.expect('.')?;
            }
        }
    }

    fn prefix_decl(&mut self) -> ParseResult<()> {
        self.skip_ws();
        let mut prefix = String::new();
        while let Some(c) = self.peek() {
            if c == ':' {
                break;
            }
            if !is_name_char(c) {
                return Err(self.error(format!("invalid character '{}' in prefix", c)));
            }
            prefix.push(c);
            self.bump();
        }
        self.expect(':')?;
        self.skip_ws();
        let iri = self.iri_ref()?;
        self.graph.set_prefix(prefix.clone(), iri.clone());
        self.prefixes.insert(prefix, iri);
        Ok(())
    }

    fn base_decl(&mut self) -> ParseResult<()> {
        self.skip_ws();
        let iri = self.iri_ref()?;
        self.base = Some(iri);
        Ok(())
    }

    fn triples(&mut self) -> ParseResult<()> {
        self.skip_ws();
        if self.peek() == Some('[') {
            let subject = self.blank_node_property_list()?;
            self.skip_ws();
            if self.peek() != Some('.') {
                self.predicate_object_list(&subject)?;
            }
            return Ok(());
        }
        let subject = self.subject()?;
        self.predicate_object_list(&subject)
    }

    fn subject(&mut self) -> ParseResult<Term> {
        self.skip_ws();
        match self.peek() {
            Some('<') => Ok(Term::Iri(self.iri_ref()?)),
            Some('_') if self.peek_at(1) == Some(':') => Ok(self.blank_label()),
            Some('(') => self.collection(),
            Some(_) => Ok(Term::Iri(self.prefixed_name()?)),
            None => Err(self.error("expected subject, found end of input")),
        }
    }

    fn predicate_object_list(&mut self, subject: &Term) -> ParseResult<()> {
        loop {
            self.skip_ws();
            let predicate = self.verb()?;
            self.object_list(subject, &predicate)?;
            self.skip_ws();
            if self.peek() != Some(';') {
                return Ok(());
            }
            // One or more ';', possibly trailing
            while self.peek() == Some(';') {
                self.bump();
                self.skip_ws();
            }
            if matches!(self.peek(), Some('.') | Some(']') | None) {
                return Ok(());
            }
        }
    }

    fn verb(&mut self) -> ParseResult<Term> {
        self.skip_ws();
        if self.peek() == Some('a')
            && self
                .peek_at(1)
                .map(|c| c.is_whitespace() || c == '<' || c == '[' || c == '(')
                .unwrap_or(false)
        {
            self.bump();
            return Ok(Term::iri(rdf::TYPE));
        }
        match self.peek() {
            Some('<') => Ok(Term::Iri(self.iri_ref()?)),
            Some(_) => Ok(Term::Iri(self.prefixed_name()?)),
            None => Err(self.error("expected predicate, found end of input")),
        }
    }

    fn object_list(&mut self, subject: &Term, predicate: &Term) -> ParseResult<()> {
        loop {
            let object = self.object()?;
            self.graph.insert(subject.clone(), predicate.clone(), object);
            self.skip_ws();
            if self.peek() == Some(',') {
                self.bump();
            } else {
                return Ok(());
            }
        }
    }

    fn object(&mut self) -> ParseResult<Term> {
        self.skip_ws();
        match self.peek() {
            Some('<') => Ok(Term::Iri(self.iri_ref()?)),
            Some('_') if self.peek_at(1) == Some(':') => Ok(self.blank_label()),
            Some('[') => self.blank_node_property_list(),
            Some('(') => self.collection(),
            Some('"') | Some('\'') => self.literal(),
            Some(c) if c.is_ascii_digit() || c == '+' || c == '-' || c == '.' => self.number(),
            Some(_) if self.at_keyword("true") => {
                self.consume(4);
                Ok(Term::boolean(true))
            }
            Some(_) if self.at_keyword("false") => {
                self.consume(5);
                Ok(Term::boolean(false))
            }
            Some(_) => Ok(Term::Iri(self.prefixed_name()?)),
            None => Err(self.error("expected object, found end of input")),
        }
    }

    fn iri_ref(&mut self) -> ParseResult<String> {
        self.expect('<')?;
        let mut iri = String::new();
        loop {
            match self.bump() {
                Some('>') => break,
                Some('\\') => iri.push(self.unicode_escape()?),
                Some(c) if c == '\n' || c == ' ' => {
                    return Err(self.error("whitespace in IRI"));
                }
                Some(c) => iri.push(c),
                None => return Err(self.error("unterminated IRI")),
            }
        }
        Ok(self.resolve(iri))
    }

    fn resolve(&self, iri: String) -> String {
        let has_scheme = iri
            .split_once(':')
            .map(|(scheme, _)| {
                !scheme.is_empty()
                    && scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
            })
            .unwrap_or(false);
        match &self.base {
            Some(base) if !has_scheme => format!("{}{}", base, iri),
            _ => iri,
        }
    }

    fn unicode_escape(&mut self) -> ParseResult<char> {
        let len = match self.bump() {
            Some('u') => 4,
            Some('U') => 8,
            _ => return Err(self.error("invalid escape in IRI")),
        };
        self.hex_char(len)
    }

    fn hex_char(&mut self, len: usize) -> ParseResult<char> {
        let mut hex = String::new();
        for _ in 0..len {
            match self.bump() {
                Some(c) if c.is_ascii_hexdigit() => hex.push(c),
                _ => return Err(self.error("invalid unicode escape")),
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error("invalid unicode code point"))
    }

    fn prefixed_name(&mut self) -> ParseResult<String> {
        let mut prefix = String::new();
        while let Some(c) = self.peek() {
            if c == ':' {
                break;
            }
            if !is_name_char(c) {
                return Err(self.error(format!("unexpected character '{}'", c)));
            }
            prefix.push(c);
            self.bump();
        }
        if self.peek() != Some(':') {
            return Err(self.error(format!("expected prefixed name, found '{}'", prefix)));
        }
        self.bump();

        let mut local = String::new();
        while let Some(c) = self.peek() {
            if is_name_char(c) || c == ':' {
                local.push(c);
                self.bump();
            } else if c == '%' {
                local.push(c);
                self.bump();
            } else if c == '\\' {
                self.bump();
                match self.bump() {
                    Some(esc) => local.push(esc),
                    None => return Err(self.error("dangling escape in local name")),
                }
            } else {
                break;
            }
        }
        // A trailing '.' ends the statement, it is not part of the name
        while local.ends_with('.') {
            local.pop();
            self.pos -= 1;
            self.column -= 1;
        }

        let namespace = self
            .prefixes
            .get(&prefix)
            .ok_or_else(|| self.error(format!("undefined prefix '{}:'", prefix)))?;
        Ok(format!("{}{}", namespace, local))
    }

    fn blank_label(&mut self) -> Term {
        self.consume(2);
        let mut label = String::new();
        while let Some(c) = self.peek() {
            if is_name_char(c) {
                label.push(c);
                self.bump();
            } else {
                break;
            }
        }
        while label.ends_with('.') {
            label.pop();
            self.pos -= 1;
            self.column -= 1;
        }
        if let Some(term) = self.labels.get(&label) {
            return term.clone();
        }
        let term = self.graph.blank();
        self.labels.insert(label, term.clone());
        term
    }

    fn blank_node_property_list(&mut self) -> ParseResult<Term> {
        self.expect('[')?;
        let node = self.graph.blank();
        self.skip_ws();
        if self.peek() != Some(']') {
            self.predicate_object_list(&node)?;
        }
        self.expect(']')?;
        Ok(node)
    }

    fn collection(&mut self) -> ParseResult<Term> {
        self.expect('(')?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(')') => {
                    self.bump();
                    break;
                }
                None => return Err(self.error("unterminated collection")),
                Some(_) => items.push(self.object()?),
            }
        }
        Ok(self.graph.add_list(items))
    }

    fn literal(&mut self) -> ParseResult<Term> {
        let lexical = self.string()?;
        match self.peek() {
            Some('@') => {
                self.bump();
                let mut lang = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '-' {
                        lang.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                if lang.is_empty() {
                    return Err(self.error("empty language tag"));
                }
                Ok(Term::Literal(Literal::lang_string(lexical, lang)))
            }
            Some('^') if self.peek_at(1) == Some('^') => {
                self.consume(2);
                let datatype = match self.peek() {
                    Some('<') => self.iri_ref()?,
                    _ => self.prefixed_name()?,
                };
                Ok(Term::Literal(Literal::typed(lexical, datatype)))
            }
            _ => Ok(Term::string(lexical)),
        }
    }

    fn string(&mut self) -> ParseResult<String> {
        let quote = self.bump().ok_or_else(|| self.error("expected string"))?;
        let long = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if long {
            self.consume(2);
        }
        let mut value = String::new();
        loop {
            let c = self.peek().ok_or_else(|| self.error("unterminated string"))?;
            if c == '\n' && !long {
                return Err(self.error("newline in short string"));
            }
            self.bump();
            if c == quote {
                if !long {
                    break;
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.consume(2);
                    break;
                }
                value.push(c);
            } else if c == '\\' {
                let esc = self.bump().ok_or_else(|| self.error("unterminated string"))?;
                match esc {
                    't' => value.push('\t'),
                    'n' => value.push('\n'),
                    'r' => value.push('\r'),
                    'b' => value.push('\u{8}'),
                    'f' => value.push('\u{c}'),
                    '"' => value.push('"'),
                    '\'' => value.push('\''),
                    '\\' => value.push('\\'),
                    'u' => value.push(self.hex_char(4)?),
                    'U' => value.push(self.hex_char(8)?),
                    other => return Err(self.error(format!("invalid escape '\\{}'", other))),
                }
            } else {
                value.push(c);
            }
        }
        Ok(value)
    }

    fn number(&mut self) -> ParseResult<Term> {
        let mut text = String::new();
        if let Some(sign @ ('+' | '-')) = self.peek() {
            text.push(sign);
            self.bump();
        }
        let mut seen_digit = false;
        while let Some(c) = self.peek().filter(char::is_ascii_digit) {
            text.push(c);
            seen_digit = true;
            self.bump();
        }
        let mut datatype = xsd::INTEGER;
        if self.peek() == Some('.') && self.peek_at(1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
            text.push('.');
            self.bump();
            while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                text.push(c);
                seen_digit = true;
                self.bump();
            }
            datatype = xsd::DECIMAL;
        }
        if !seen_digit {
            return Err(self.error("invalid number"));
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            text.push('e');
            self.bump();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                text.push(sign);
                self.bump();
            }
            let mut exp_digits = false;
            while let Some(c) = self.peek().filter(char::is_ascii_digit) {
                text.push(c);
                exp_digits = true;
                self.bump();
            }
            if !exp_digits {
                return Err(self.error("invalid exponent"));
            }
            datatype = xsd::DOUBLE;
        }
        Ok(Term::Literal(Literal::typed(text, datatype)))
    }
}
