use std::fmt;

use itertools::Itertools;
use serde::Serialize;

use crate::process::Leg;

/// Summation index of the exchanged gluon.
pub const GLUON_INDEX: isize = -6000;
/// Offset below which the replaced color indices of linked legs live.
pub const MIN_INDEX: isize = -3000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ColorFactor {
    /// Generator chain, the last two indices are the fundamental ones.
    T(Vec<isize>),
    /// Structure constant.
    F(isize, isize, isize),
}

impl fmt::Display for ColorFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorFactor::T(indices) => write!(f, "T({})", indices.iter().join(",")),
            ColorFactor::F(a, b, c) => write!(f, "f({},{},{})", a, b, c),
        }
    }
}

/// Reduced fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coefficient {
    pub numerator: i64,
    pub denominator: i64,
}

impl Coefficient {
    pub const ONE: Coefficient = Coefficient {
        numerator: 1,
        denominator: 1,
    };

    pub fn new(numerator: i64, denominator: i64) -> Coefficient {
        let mut a = numerator.abs();
        let mut b = denominator.abs();
        while b != 0 {
            (a, b) = (b, a % b);
        }
        let gcd = a.max(1);
        let sign = if denominator < 0 { -1 } else { 1 };
        Coefficient {
            numerator: sign * numerator / gcd,
            denominator: sign * denominator / gcd,
        }
    }

    pub fn times(self, numerator: i64, denominator: i64) -> Coefficient {
        Coefficient::new(self.numerator * numerator, self.denominator * denominator)
    }
}

impl fmt::Display for Coefficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColorString {
    pub factors: Vec<ColorFactor>,
    pub coefficient: Coefficient,
    pub is_imaginary: bool,
}

impl Default for ColorString {
    fn default() -> Self {
        ColorString {
            factors: vec![],
            coefficient: Coefficient::ONE,
            is_imaginary: false,
        }
    }
}

impl ColorString {
    pub fn product(&mut self, factor: ColorFactor, imaginary: bool) {
        self.factors.push(factor);
        // i * i = -1
        if imaginary && self.is_imaginary {
            self.coefficient = self.coefficient.times(-1, 1);
        }
        self.is_imaginary ^= imaginary;
    }
}

impl fmt::Display for ColorString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.coefficient)?;
        for factor in self.factors.iter() {
            write!(f, " {}", factor)?;
        }
        if self.is_imaginary {
            write!(f, " I")?;
        }
        Ok(())
    }
}

/// Soft gluon exchange between two colored legs of a Born process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorLink {
    pub legs: [Leg; 2],
    pub string: ColorString,
    /// Pairs of (leg number, index replacing it in the color string).
    pub replacements: Vec<[isize; 2]>,
}

impl ColorLink {
    pub fn leg_numbers(&self) -> (usize, usize) {
        (self.legs[0].number, self.legs[1].number)
    }
}
