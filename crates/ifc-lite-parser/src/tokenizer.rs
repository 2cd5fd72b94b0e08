// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP file tokenizer using nom combinators
//!
//! Parses STEP/IFC entity definitions into tokens.

use crate::text::decode_step_string;
use ifc_lite_model::{AttributeValue, DecodedEntity, EntityId, IfcType};
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{opt, recognize},
    error::{Error, ErrorKind},
    multi::separated_list0,
    sequence::{delimited, pair},
    IResult, Parser,
};

/// Raw token from STEP file (before conversion to AttributeValue)
#[derive(Clone, Debug, PartialEq)]
pub enum Token<'a> {
    /// Entity reference (#123)
    EntityRef(u32),
    /// String value ('text'), still escaped
    String(&'a str),
    /// Integer value
    Integer(i64),
    /// Float value
    Float(f64),
    /// Enumeration (.VALUE.)
    Enum(&'a str),
    /// Binary literal ("0FF"), hex digits without quotes
    Binary(&'a str),
    /// List of tokens
    List(Vec<Token<'a>>),
    /// Typed value like IFCLABEL('text')
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Null value ($)
    Null,
    /// Derived value (*)
    Derived,
}

impl<'a> Token<'a> {
    /// Convert token to owned AttributeValue
    pub fn to_attribute_value(&self) -> AttributeValue {
        match self {
            Token::EntityRef(id) => AttributeValue::EntityRef(EntityId(*id)),
            Token::String(s) => AttributeValue::String(decode_step_string(s)),
            Token::Integer(i) => AttributeValue::Integer(*i),
            Token::Float(f) => AttributeValue::Float(*f),
            Token::Enum(s) => AttributeValue::Enum((*s).to_string()),
            Token::Binary(hex) => AttributeValue::Binary((*hex).to_string()),
            Token::List(items) => {
                AttributeValue::List(items.iter().map(|t| t.to_attribute_value()).collect())
            }
            Token::TypedValue(name, args) => AttributeValue::TypedValue(
                (*name).to_string(),
                args.iter().map(|t| t.to_attribute_value()).collect(),
            ),
            Token::Null => AttributeValue::Null,
            Token::Derived => AttributeValue::Derived,
        }
    }
}

// ============================================================================
// Parsing Primitives
// ============================================================================

/// Parse whitespace
fn ws(input: &str) -> IResult<&str, ()> {
    let (input, _) = multispace0(input)?;
    Ok((input, ()))
}

/// Parse an entity reference (#123)
fn entity_ref(input: &str) -> IResult<&str, Token> {
    let start = input;
    let (input, _) = char('#')(input)?;
    let (input, digits) = take_while1(|c: char| c.is_ascii_digit())(input)?;
    let id = digits
        .parse::<u32>()
        .map_err(|_| out_of_range(start, ErrorKind::Digit))?;
    Ok((input, Token::EntityRef(id)))
}

/// Hard failure for a literal that matched but cannot be represented
///
/// A failure is not retried by `alt`, so the whole record is rejected instead
/// of being read with a substitute value.
fn out_of_range(input: &str, kind: ErrorKind) -> nom::Err<Error<&str>> {
    nom::Err::Failure(Error::new(input, kind))
}

/// Parse a STEP string ('text' with '' for escaped quotes)
fn step_string(input: &str) -> IResult<&str, Token> {
    let (input, _) = char('\'')(input)?;

    let mut end = 0;
    let bytes = input.as_bytes();
    while end < bytes.len() {
        if bytes[end] == b'\'' {
            if end + 1 < bytes.len() && bytes[end + 1] == b'\'' {
                end += 2;
                continue;
            }
            break;
        }
        end += 1;
    }

    if end >= bytes.len() {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Char)));
    }

    let content = &input[..end];
    let remaining = &input[end + 1..]; // Skip closing quote

    Ok((remaining, Token::String(content)))
}

/// Parse a number (integer or float)
fn number(input: &str) -> IResult<&str, Token> {
    let start = input;
    let (input, num_str) = recognize((
        opt(alt((char('-'), char('+')))),
        take_while1(|c: char| c.is_ascii_digit()),
        opt(pair(char('.'), take_while(|c: char| c.is_ascii_digit()))),
        opt((
            alt((char('e'), char('E'))),
            opt(alt((char('+'), char('-')))),
            take_while1(|c: char| c.is_ascii_digit()),
        )),
    ))
    .parse(input)?;

    // Use lexical-core for fast parsing
    let digits = num_str.strip_prefix('+').unwrap_or(num_str);
    if num_str.contains('.') || num_str.contains('e') || num_str.contains('E') {
        let f: f64 = lexical_core::parse(digits.as_bytes())
            .map_err(|_| out_of_range(start, ErrorKind::Float))?;
        if !f.is_finite() {
            return Err(out_of_range(start, ErrorKind::Float));
        }
        Ok((input, Token::Float(f)))
    } else {
        let i: i64 = lexical_core::parse(digits.as_bytes())
            .map_err(|_| out_of_range(start, ErrorKind::Digit))?;
        Ok((input, Token::Integer(i)))
    }
}

/// Parse an enumeration (.VALUE.)
fn enumeration(input: &str) -> IResult<&str, Token> {
    let (input, _) = char('.')(input)?;
    let (input, name) = take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)?;
    let (input, _) = char('.')(input)?;
    Ok((input, Token::Enum(name)))
}

/// Parse a binary literal ("0FF")
fn binary(input: &str) -> IResult<&str, Token> {
    let (input, hex) = delimited(
        char('"'),
        take_while(|c: char| c.is_ascii_hexdigit()),
        char('"'),
    )
    .parse(input)?;
    Ok((input, Token::Binary(hex)))
}

/// Parse null ($)
fn null_value(input: &str) -> IResult<&str, Token> {
    let (input, _) = char('$')(input)?;
    Ok((input, Token::Null))
}

/// Parse derived (*)
fn derived_value(input: &str) -> IResult<&str, Token> {
    let (input, _) = char('*')(input)?;
    Ok((input, Token::Derived))
}

/// Parse a list of tokens
fn list(input: &str) -> IResult<&str, Token> {
    let (input, items) = delimited(
        pair(char('('), ws),
        separated_list0((ws, char(','), ws), token),
        pair(ws, char(')')),
    )
    .parse(input)?;
    Ok((input, Token::List(items)))
}

/// Parse a typed value like IFCLABEL('text')
fn typed_value(input: &str) -> IResult<&str, Token> {
    let (input, type_name) = take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)?;
    let (input, _) = ws(input)?;
    let (input, args) = delimited(
        pair(char('('), ws),
        separated_list0((ws, char(','), ws), token),
        pair(ws, char(')')),
    )
    .parse(input)?;
    Ok((input, Token::TypedValue(type_name, args)))
}

/// Parse any token
fn token(input: &str) -> IResult<&str, Token> {
    alt((
        entity_ref,
        step_string,
        binary,
        null_value,
        derived_value,
        enumeration,
        number,
        list,
        typed_value,
    ))
    .parse(input)
}

/// Parse entity attribute list
fn attribute_list(input: &str) -> IResult<&str, Vec<Token>> {
    delimited(
        pair(char('('), ws),
        separated_list0((ws, char(','), ws), token),
        pair(ws, char(')')),
    )
    .parse(input)
}

// ============================================================================
// Entity Parsing
// ============================================================================

/// Parse a complete entity definition
///
/// Format: `#123=IFCWALL(attr1,attr2,...);`
pub fn parse_entity(input: &str) -> Result<DecodedEntity, String> {
    let input = input.trim_start();

    let (input, _) = char::<&str, Error<&str>>('#')
        .parse(input)
        .map_err(|_| "Expected # at start of entity")?;

    let (input, id_str) = take_while1::<_, &str, Error<&str>>(|c: char| {
        c.is_ascii_digit()
    })
    .parse(input)
    .map_err(|_| "Expected entity ID")?;

    let id: u32 = id_str.parse().map_err(|_| "Invalid entity ID")?;

    let (input, _) = (ws, char('='), ws)
        .parse(input)
        .map_err(|_: nom::Err<Error<&str>>| "Expected = after entity ID")?;

    let (input, type_name) =
        take_while1::<_, &str, Error<&str>>(|c: char| c.is_alphanumeric() || c == '_')
            .parse(input)
            .map_err(|_| "Expected type name")?;

    let (input, _) = ws(input).unwrap_or((input, ()));

    let (rest, tokens) =
        attribute_list(input).map_err(|e| format!("Failed to parse attributes: {:?}", e))?;

    let rest = rest.trim_start();
    if !rest.is_empty() && !rest.starts_with(';') {
        return Err(format!("Unexpected trailing input: {}", rest));
    }

    let attributes: Vec<AttributeValue> = tokens.iter().map(|t| t.to_attribute_value()).collect();

    Ok(DecodedEntity {
        id: EntityId(id),
        ifc_type: IfcType::parse(type_name),
        attributes,
    })
}

/// Parse entity from a byte range of the document
pub fn parse_entity_at(content: &str, start: usize, end: usize) -> Result<DecodedEntity, String> {
    let slice = content
        .get(start..end)
        .ok_or_else(|| format!("Entity range {}..{} is out of bounds", start, end))?;
    parse_entity(slice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_ref() {
        let (remaining, token) = entity_ref("#123").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(token, Token::EntityRef(123));
    }

    #[test]
    fn test_parse_string_with_escaped_quote() {
        let (remaining, token) = step_string("'it''s a test'").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(token, Token::String("it''s a test"));
        assert_eq!(
            token.to_attribute_value(),
            AttributeValue::String("it's a test".to_string())
        );
    }

    #[test]
    fn test_unterminated_string_fails() {
        assert!(step_string("'open").is_err());
    }

    #[test]
    fn test_parse_real_without_fraction_digits() {
        let (remaining, token) = number("3000.").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(token, Token::Float(3000.0));
    }

    #[test]
    fn test_parse_number_scientific() {
        let (remaining, token) = number("1.5E-3").unwrap();
        assert_eq!(remaining, "");
        if let Token::Float(f) = token {
            assert!((f - 0.0015).abs() < 1e-10);
        } else {
            panic!("Expected float");
        }
    }

    #[test]
    fn test_out_of_range_numbers_reject_the_record() {
        assert!(matches!(number("99999999999999999999"), Err(nom::Err::Failure(_))));
        assert!(matches!(number("1.0E999"), Err(nom::Err::Failure(_))));
        assert!(matches!(entity_ref("#99999999999"), Err(nom::Err::Failure(_))));

        assert!(parse_entity("#1=IFCQUANTITYCOUNT('N',$,$,99999999999999999999,$);").is_err());
        assert!(parse_entity("#1=IFCQUANTITYLENGTH('L',$,$,1.0E999,$);").is_err());
        assert!(parse_entity("#1=IFCPROPERTYSET('g',$,'P',$,(#20,#99999999999));").is_err());
    }

    #[test]
    fn test_parse_signed_numbers() {
        assert_eq!(number("+3").unwrap().1, Token::Integer(3));
        assert_eq!(number("-2.5").unwrap().1, Token::Float(-2.5));
    }

    #[test]
    fn test_parse_binary() {
        let (remaining, token) = binary("\"0FF\"").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(token, Token::Binary("0FF"));

        let entity = parse_entity("#23=IFCPIXELTEXTURE(.T.,.T.,$,$,$,2,1,1,(\"0FF\"));").unwrap();
        assert_eq!(
            entity.attributes[8],
            AttributeValue::List(vec![AttributeValue::Binary("0FF".into())])
        );
    }

    #[test]
    fn test_parse_enum() {
        let (remaining, token) = enumeration(".T.").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(token, Token::Enum("T"));
    }

    #[test]
    fn test_parse_typed_value() {
        let (remaining, token) = typed_value("IFCREAL(3000.)").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(token, Token::TypedValue("IFCREAL", vec![Token::Float(3000.0)]));
    }

    #[test]
    fn test_parse_property_single_value() {
        let entity =
            parse_entity("#26=IFCPROPERTYSINGLEVALUE('Width',$,IFCREAL(3000.),$);").unwrap();
        assert_eq!(entity.id, EntityId(26));
        assert_eq!(entity.ifc_type, IfcType::IfcPropertySingleValue);
        assert_eq!(entity.attributes.len(), 4);
        assert_eq!(entity.get_string(0), Some("Width"));
        assert!(entity.attributes[1].is_null());
        assert_eq!(entity.attributes[2].as_float(), Some(3000.0));
    }

    #[test]
    fn test_parse_entity_with_list() {
        let entity = parse_entity("#21=IFCPROPERTYSET('g',#5,'Pset',$,(#20, #26));").unwrap();
        assert_eq!(entity.get_refs(4), Some(vec![EntityId(20), EntityId(26)]));
    }
}
