use std::fmt::Display;

use crate::{
    interner::Interner,
    object::{ObjString, Object},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Nil,
    Obj(Object),
}

impl Value {
    pub fn as_string(&self) -> Option<ObjString> {
        match *self {
            Self::Obj(obj) => obj.as_string(),
            _ => None,
        }
    }

    pub fn string(handle: ObjString) -> Self {
        Self::Obj(Object::String(handle))
    }

    /// `nil`, `false` and numeric zero are falsey; everything else is truthy.
    pub fn is_falsey(&self) -> bool {
        match *self {
            Value::Nil => true,
            Value::Bool(b) => !b,
            Value::Number(n) => n == 0.0,
            Value::Obj(_) => false,
        }
    }

    /// Renders the value, resolving heap objects through `interner`.
    pub fn display<'a, 'heap>(&'a self, interner: &'a Interner<'heap>) -> ValueDisplay<'a, 'heap> {
        ValueDisplay {
            value: self,
            interner,
        }
    }
}

pub struct ValueDisplay<'a, 'heap> {
    value: &'a Value,
    interner: &'a Interner<'heap>,
}

impl Display for ValueDisplay<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.value {
            Value::Obj(Object::String(s)) => match self.interner.lookup(*s) {
                Some(chars) => write!(f, "{}", chars),
                None => write!(f, "{}", s),
            },
            other => write!(f, "{}", other),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(bool) => write!(f, "{}", bool),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Nil => write!(f, "nil"),
            Value::Obj(Object::String(s)) => write!(f, "{}", s),
        }
    }
}

const SIGNIFICANT_DIGITS: usize = 6;

/// Renders a number the way C's `%g` does: six significant digits, exponent
/// form for very small or large magnitudes, no trailing zeros.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return String::from("nan");
    }
    if n.is_infinite() {
        return String::from(if n > 0.0 { "inf" } else { "-inf" });
    }

    let scientific = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, n);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or_default()),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exponent.abs())
    } else {
        let decimals = (SIGNIFICANT_DIGITS as i32 - 1 - exponent) as usize;
        trim_zeros(&format!("{:.*}", decimals, n)).to_owned()
    }
}

fn trim_zeros(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use typed_arena::Arena;

    #[test]
    fn zero_nil_and_false_are_falsey() {
        assert!(Value::Nil.is_falsey());
        assert!(Value::Bool(false).is_falsey());
        assert!(Value::Number(0.0).is_falsey());
        assert!(Value::Number(-0.0).is_falsey());

        assert!(!Value::Bool(true).is_falsey());
        assert!(!Value::Number(0.5).is_falsey());
        assert!(!Value::Number(-3.0).is_falsey());
    }

    #[test]
    fn strings_are_truthy_even_when_empty() {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let empty = Value::Obj(Object::copy_string("", &mut interner));
        assert!(!empty.is_falsey());
    }

    #[test]
    fn equality_is_per_tag() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_eq!(Value::Number(1.5), Value::Number(1.5));
        assert_ne!(Value::Number(0.0), Value::Bool(false));
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn objects_compare_by_handle() {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let a = Value::Obj(Object::copy_string("a", &mut interner));
        let also_a = Value::Obj(Object::copy_string("a", &mut interner));
        let b = Value::Obj(Object::copy_string("b", &mut interner));

        assert_eq!(a, also_a);
        assert_ne!(a, b);
    }

    #[test]
    fn renders_through_the_interner() {
        let arena = Arena::new();
        let mut interner = Interner::new(&arena);
        let s = Value::Obj(Object::copy_string("hi there", &mut interner));

        assert_eq!(s.display(&interner).to_string(), "hi there");
        assert_eq!(Value::Number(7.0).display(&interner).to_string(), "7");
        assert_eq!(Value::Number(2.5).display(&interner).to_string(), "2.5");
        assert_eq!(Value::Nil.display(&interner).to_string(), "nil");
        assert_eq!(Value::Bool(true).display(&interner).to_string(), "true");
    }

    #[test]
    fn numbers_print_like_percent_g() {
        assert_eq!(format_number(7.0), "7");
        assert_eq!(format_number(-6.0), "-6");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(499500.0), "499500");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(0.0001), "0.0001");
        assert_eq!(format_number(0.00001), "1e-05");
        assert_eq!(format_number(1e6), "1e+06");
        assert_eq!(format_number(123456789.0), "1.23457e+08");
        assert_eq!(format_number(1e23), "1e+23");
        assert_eq!(format_number(-1.5e-7), "-1.5e-07");
        assert_eq!(format_number(f64::NAN), "nan");
        assert_eq!(format_number(f64::INFINITY), "inf");
        assert_eq!(format_number(f64::NEG_INFINITY), "-inf");
    }
}
