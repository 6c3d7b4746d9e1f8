//! Type signatures
//!
//! A signature is the structural identity of a type: a base name plus an
//! ordered list of parameters. Base names compare case-insensitively, so
//! `BIGINT` and `bigint` name the same type.

use crate::common::error::PrismResult;
use crate::invalid_arg_err;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Suffix of the zoned temporal base names (`timestamp with time zone`)
const WITH_TIME_ZONE: &str = "with time zone";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeSignature {
    base: String,
    parameters: Vec<TypeSignatureParameter>,
}

/// One parameter of a [`TypeSignature`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeSignatureParameter {
    /// A nested type, e.g. the element of `array(bigint)`
    Type(TypeSignature),
    /// A numeric literal, e.g. the length of `varchar(10)`
    Long(i64),
    /// An optionally named nested type, e.g. a field of `row(a bigint)`
    NamedType(NamedTypeSignature),
    /// An unresolved type variable
    Variable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedTypeSignature {
    pub name: Option<String>,
    pub type_signature: TypeSignature,
}

impl TypeSignature {
    pub fn new(base: impl Into<String>, parameters: Vec<TypeSignatureParameter>) -> Self {
        Self {
            base: base.into(),
            parameters,
        }
    }

    /// Signature without parameters
    pub fn simple(base: impl Into<String>) -> Self {
        Self::new(base, Vec::new())
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn parameters(&self) -> &[TypeSignatureParameter] {
        &self.parameters
    }

    /// Nested type signatures among the parameters, named ones included
    pub fn type_parameters(&self) -> Vec<&TypeSignature> {
        self.parameters
            .iter()
            .filter_map(|parameter| match parameter {
                TypeSignatureParameter::Type(signature) => Some(signature),
                TypeSignatureParameter::NamedType(named) => Some(&named.type_signature),
                _ => None,
            })
            .collect()
    }

    /// True when some parameter, at any depth, is an unresolved variable
    pub fn is_calculated(&self) -> bool {
        self.parameters
            .iter()
            .any(TypeSignatureParameter::is_calculated)
    }

    /// Parses the textual form, e.g. `map(varchar(10),array(bigint))`,
    /// `row(a bigint, b varchar)` or `timestamp(3) with time zone`
    pub fn parse(input: &str) -> PrismResult<Self> {
        let mut parser = SignatureParser::new(input);
        let signature = parser.signature()?;
        parser.skip_whitespace();
        if !parser.at_end() {
            return Err(parser.error());
        }
        Ok(signature)
    }
}

impl PartialEq for TypeSignature {
    fn eq(&self, other: &Self) -> bool {
        self.base.eq_ignore_ascii_case(&other.base) && self.parameters == other.parameters
    }
}

impl Eq for TypeSignature {}

impl Hash for TypeSignature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.base.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
        self.parameters.hash(state);
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        if self.parameters.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (index, parameter) in self.parameters.iter().enumerate() {
            if index > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", parameter)?;
        }
        write!(f, ")")
    }
}

impl TypeSignatureParameter {
    pub fn is_calculated(&self) -> bool {
        match self {
            TypeSignatureParameter::Type(signature) => signature.is_calculated(),
            TypeSignatureParameter::Long(_) => false,
            TypeSignatureParameter::NamedType(named) => named.type_signature.is_calculated(),
            TypeSignatureParameter::Variable(_) => true,
        }
    }
}

impl fmt::Display for TypeSignatureParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignatureParameter::Type(signature) => write!(f, "{}", signature),
            TypeSignatureParameter::Long(value) => write!(f, "{}", value),
            TypeSignatureParameter::NamedType(named) => match &named.name {
                Some(name) => write!(f, "{} {}", name, named.type_signature),
                None => write!(f, "{}", named.type_signature),
            },
            TypeSignatureParameter::Variable(name) => write!(f, "{}", name),
        }
    }
}

impl From<TypeSignature> for TypeSignatureParameter {
    fn from(signature: TypeSignature) -> Self {
        TypeSignatureParameter::Type(signature)
    }
}

impl From<i64> for TypeSignatureParameter {
    fn from(value: i64) -> Self {
        TypeSignatureParameter::Long(value)
    }
}

/// Recursive-descent parser over the textual signature form
struct SignatureParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> SignatureParser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn error(&self) -> crate::common::error::PrismError {
        invalid_arg_err!("Bad type signature: '{}' at offset {}", self.input, self.pos)
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn identifier(&mut self) -> PrismResult<&'a str> {
        self.skip_whitespace();
        let rest = self.rest();
        let length = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if length == 0 || !rest.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
            return Err(self.error());
        }
        self.pos += length;
        Ok(&rest[..length])
    }

    /// Consumes ` with time zone` when it follows
    fn time_zone_suffix(&mut self) -> bool {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        let matches = trimmed.len() >= WITH_TIME_ZONE.len()
            && trimmed[..WITH_TIME_ZONE.len()].eq_ignore_ascii_case(WITH_TIME_ZONE)
            && trimmed[WITH_TIME_ZONE.len()..]
                .chars()
                .next()
                .is_none_or(|c| !c.is_ascii_alphanumeric());
        if matches {
            self.pos += rest.len() - trimmed.len() + WITH_TIME_ZONE.len();
        }
        matches
    }

    fn signature(&mut self) -> PrismResult<TypeSignature> {
        let mut base = self.identifier()?.to_string();
        if self.time_zone_suffix() {
            base = format!("{} {}", base, WITH_TIME_ZONE);
        }

        let mut parameters = Vec::new();
        if self.eat('(') {
            loop {
                parameters.push(self.parameter()?);
                if self.eat(',') {
                    continue;
                }
                if self.eat(')') {
                    break;
                }
                return Err(self.error());
            }
            if self.time_zone_suffix() {
                base = format!("{} {}", base, WITH_TIME_ZONE);
            }
        }
        Ok(TypeSignature::new(base, parameters))
    }

    fn parameter(&mut self) -> PrismResult<TypeSignatureParameter> {
        self.skip_whitespace();
        let rest = self.rest();
        if rest.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
            let length = rest[1..]
                .find(|c: char| !c.is_ascii_digit())
                .map_or(rest.len(), |index| index + 1);
            let value = rest[..length].parse::<i64>().map_err(|_| self.error())?;
            self.pos += length;
            return Ok(TypeSignatureParameter::Long(value));
        }

        // `name type` is a named field; a lone identifier is a type
        let start = self.pos;
        let name = self.identifier()?;
        let after_name = self.rest();
        let separated = after_name.starts_with(char::is_whitespace);
        let followed_by_type = after_name
            .trim_start()
            .starts_with(|c: char| c.is_ascii_alphabetic() || c == '_');
        if separated && followed_by_type && !self.time_zone_ahead() {
            let type_signature = self.signature()?;
            return Ok(TypeSignatureParameter::NamedType(NamedTypeSignature {
                name: Some(name.to_string()),
                type_signature,
            }));
        }

        self.pos = start;
        Ok(TypeSignatureParameter::Type(self.signature()?))
    }

    fn time_zone_ahead(&self) -> bool {
        let trimmed = self.rest().trim_start();
        trimmed.len() >= WITH_TIME_ZONE.len()
            && trimmed[..WITH_TIME_ZONE.len()].eq_ignore_ascii_case(WITH_TIME_ZONE)
    }
}
