//! Calculator
//! Six binary operations over f64 with a total dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Modulus,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Add,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
        Operation::Power,
        Operation::Modulus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
            Operation::Power => "power",
            Operation::Modulus => "modulus",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Operation::ALL.into_iter().find(|op| op.as_str() == s)
    }

    pub fn apply(self, a: f64, b: f64) -> Result<f64, CalcError> {
        let result = match self {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply => a * b,
            Operation::Divide => {
                if b == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                a / b
            }
            Operation::Power => a.powf(b),
            Operation::Modulus => {
                if b == 0.0 {
                    return Err(CalcError::ModulusByZero);
                }
                floored_rem(a, b)
            }
        };

        if !result.is_finite() {
            return Err(CalcError::NotFinite);
        }
        Ok(result)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("Cannot divide by zero")]
    DivisionByZero,
    #[error("Cannot calculate modulus with zero divisor")]
    ModulusByZero,
    #[error("Result is not a finite number")]
    NotFinite,
}

pub fn calculate(operation: Operation, operand1: f64, operand2: f64) -> Result<f64, CalcError> {
    operation.apply(operand1, operand2)
}

// Remainder carrying the divisor's sign.
fn floored_rem(a: f64, b: f64) -> f64 {
    let r = a % b;
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }
}
