//! Built-in literal data types and their conversions.
//!
//! These back the literal parameter kinds of pipeline descriptions
//! (string, bool, int, double, point, xml).

use crate::error::ViennaMeshError;
use crate::registry::{FnConversion, Registrations, TypedKind};
use std::fmt;

pub const STRING: &str = "string";
pub const BOOL: &str = "bool";
pub const INT: &str = "int";
pub const DOUBLE: &str = "double";
pub const POINT: &str = "point";
pub const XML: &str = "xml";

/// A coordinate tuple of any dimension.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Point(pub Vec<f64>);

impl Point {
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Accepts `(1, 2, 3)`, `1,2,3` and `1 2 3`.
    pub fn parse(text: &str) -> Option<Point> {
        let text = text.trim();
        let text = text
            .strip_prefix('(')
            .and_then(|t| t.strip_suffix(')'))
            .unwrap_or(text);
        let coords = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<f64>().ok())
            .collect::<Option<Vec<f64>>>()?;
        if coords.is_empty() {
            return None;
        }
        Some(Point(coords))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}

/// Raw XML markup carried verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlFragment(pub String);

impl XmlFragment {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_int(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

pub fn parse_double(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}

fn parse_failed(to: &str, text: &str) -> ViennaMeshError {
    ViennaMeshError::ConversionFailed {
        from: STRING.to_string(),
        to: to.to_string(),
        message: format!("cannot parse '{}'", text),
    }
}

/// Stage the built-in types and conversions.
pub fn registrations() -> Registrations {
    let mut r = Registrations::new();

    r.add_type(STRING, Box::new(TypedKind::<String>::new()));
    r.add_type(BOOL, Box::new(TypedKind::<bool>::new()));
    r.add_type(INT, Box::new(TypedKind::<i64>::new()));
    r.add_type(DOUBLE, Box::new(TypedKind::<f64>::new()));
    r.add_type(POINT, Box::new(TypedKind::<Point>::new()));
    r.add_type(XML, Box::new(TypedKind::<XmlFragment>::new()));

    // Numeric
    r.add_conversion(
        INT,
        DOUBLE,
        Box::new(FnConversion::new(|a: &i64, b: &mut f64| {
            *b = *a as f64;
            Ok(())
        })),
    );
    r.add_conversion(
        DOUBLE,
        INT,
        Box::new(FnConversion::new(|a: &f64, b: &mut i64| {
            *b = a.trunc() as i64;
            Ok(())
        })),
    );
    r.add_conversion(
        BOOL,
        INT,
        Box::new(FnConversion::new(|a: &bool, b: &mut i64| {
            *b = i64::from(*a);
            Ok(())
        })),
    );
    r.add_conversion(
        INT,
        BOOL,
        Box::new(FnConversion::new(|a: &i64, b: &mut bool| {
            *b = *a != 0;
            Ok(())
        })),
    );

    // To string
    r.add_conversion(
        INT,
        STRING,
        Box::new(FnConversion::new(|a: &i64, b: &mut String| {
            *b = a.to_string();
            Ok(())
        })),
    );
    r.add_conversion(
        DOUBLE,
        STRING,
        Box::new(FnConversion::new(|a: &f64, b: &mut String| {
            *b = a.to_string();
            Ok(())
        })),
    );
    r.add_conversion(
        BOOL,
        STRING,
        Box::new(FnConversion::new(|a: &bool, b: &mut String| {
            *b = a.to_string();
            Ok(())
        })),
    );
    r.add_conversion(
        POINT,
        STRING,
        Box::new(FnConversion::new(|a: &Point, b: &mut String| {
            *b = a.to_string();
            Ok(())
        })),
    );
    r.add_conversion(
        XML,
        STRING,
        Box::new(FnConversion::new(|a: &XmlFragment, b: &mut String| {
            b.clone_from(&a.0);
            Ok(())
        })),
    );

    // From string
    r.add_conversion(
        STRING,
        INT,
        Box::new(FnConversion::new(|a: &String, b: &mut i64| {
            *b = parse_int(a).ok_or_else(|| parse_failed(INT, a))?;
            Ok(())
        })),
    );
    r.add_conversion(
        STRING,
        DOUBLE,
        Box::new(FnConversion::new(|a: &String, b: &mut f64| {
            *b = parse_double(a).ok_or_else(|| parse_failed(DOUBLE, a))?;
            Ok(())
        })),
    );
    r.add_conversion(
        STRING,
        BOOL,
        Box::new(FnConversion::new(|a: &String, b: &mut bool| {
            *b = parse_bool(a).ok_or_else(|| parse_failed(BOOL, a))?;
            Ok(())
        })),
    );
    r.add_conversion(
        STRING,
        XML,
        Box::new(FnConversion::new(|a: &String, b: &mut XmlFragment| {
            b.0.clone_from(a);
            Ok(())
        })),
    );

    r
}
