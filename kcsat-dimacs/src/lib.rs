//! DIMACS CNF parser and writer for the kcsat reasoning engine.
//!
//! The parser is count driven: the `p cnf <vars> <clauses>` header is
//! mandatory and exactly the declared number of clauses is read. Lines
//! starting with `c` or `%` are comments; anything after the last clause is
//! ignored, which accepts the `%`-terminated SATLIB benchmark files.

use std::{borrow::Borrow, io};

use kcsat_formula::{CnfFormula, Lit, Var};

use anyhow::Error;
use thiserror::Error;

/// Possible errors while parsing a DIMACS CNF formula.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: unexpected character '{found}' in DIMACS CNF input")]
    UnexpectedInput { line: usize, found: char },
    #[error("line {line}: expected a 'p cnf <vars> <clauses>' header")]
    MissingHeader { line: usize },
    #[error("line {line}: header declares {var_count} variables, which is unsupported")]
    HeaderVarCount { line: usize, var_count: usize },
    #[error("line {line}: number is too large")]
    NumberTooLarge { line: usize },
    #[error("line {line}: literal {lit} is outside the declared range of {declared} variables")]
    VarOutOfRange {
        line: usize,
        lit: isize,
        declared: usize,
    },
    #[error("line {line}: clause is not terminated by 0")]
    UnterminatedClause { line: usize },
    #[error("formula ends after {found} of {declared} declared clauses")]
    TruncatedFormula { declared: usize, found: usize },
}

/// Variable and clause count of a DIMACS CNF header.
#[derive(Copy, Clone, Debug)]
pub struct DimacsHeader {
    pub var_count: usize,
    pub clause_count: usize,
}

/// Parse a complete DIMACS CNF input.
pub fn parse_dimacs(input: impl io::Read) -> Result<CnfFormula, Error> {
    let mut bytes = vec![];
    let mut input = input;
    input.read_to_end(&mut bytes)?;
    Ok(parse_dimacs_bytes(&bytes)?)
}

/// Parse a DIMACS CNF formula from a byte slice.
pub fn parse_dimacs_bytes(bytes: &[u8]) -> Result<CnfFormula, ParseError> {
    let mut scanner = Scanner {
        bytes,
        pos: 0,
        line: 1,
        line_start: true,
    };

    let header = scanner.parse_header()?;

    let mut formula = CnfFormula::new();
    formula.set_var_count(header.var_count);

    let mut clause = vec![];
    for _ in 0..header.clause_count {
        clause.clear();
        loop {
            match scanner.next_int()? {
                None if clause.is_empty() => {
                    return Err(ParseError::TruncatedFormula {
                        declared: header.clause_count,
                        found: formula.len(),
                    });
                }
                None => {
                    return Err(ParseError::UnterminatedClause { line: scanner.line });
                }
                Some(0) => break,
                Some(value) => {
                    if value.unsigned_abs() as usize > header.var_count {
                        return Err(ParseError::VarOutOfRange {
                            line: scanner.line,
                            lit: value as isize,
                            declared: header.var_count,
                        });
                    }
                    clause.push(Lit::from_dimacs(value as isize));
                }
            }
        }
        formula.add_clause(clause.iter());
    }

    // The declared clauses are all there; leftover input (like the trailing
    // "% 0" block of SATLIB files) is not inspected.
    Ok(formula)
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    line_start: bool,
}

impl<'a> Scanner<'a> {
    /// Advance to the start of the next token, skipping comment lines.
    fn skip_to_token(&mut self) {
        while let Some(&byte) = self.bytes.get(self.pos) {
            match byte {
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'\n' => {
                    self.pos += 1;
                    self.line += 1;
                    self.line_start = true;
                }
                b'c' | b'%' if self.line_start => self.skip_line(),
                _ => {
                    self.line_start = false;
                    break;
                }
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(&byte) = self.bytes.get(self.pos) {
            self.pos += 1;
            if byte == b'\n' {
                self.line += 1;
                break;
            }
        }
    }

    /// Consume `word` if it is the next token.
    fn eat_word(&mut self, word: &[u8]) -> bool {
        self.skip_to_token();
        let end = self.pos + word.len();
        if self.bytes.get(self.pos..end) == Some(word) {
            match self.bytes.get(end) {
                None | Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.pos = end;
                    return true;
                }
                _ => (),
            }
        }
        false
    }

    /// Read the next integer token, or `None` at the end of the input.
    fn next_int(&mut self) -> Result<Option<i64>, ParseError> {
        self.skip_to_token();

        let first = match self.bytes.get(self.pos) {
            None => return Ok(None),
            Some(&byte) => byte,
        };

        let negative = first == b'-';
        if negative {
            self.pos += 1;
        }

        let mut value: u64 = 0;
        let mut digits = 0;
        while let Some(&byte) = self.bytes.get(self.pos) {
            if !byte.is_ascii_digit() {
                break;
            }
            value = value * 10 + u64::from(byte - b'0');
            if value > (1 << 62) {
                return Err(ParseError::NumberTooLarge { line: self.line });
            }
            digits += 1;
            self.pos += 1;
        }

        if digits == 0 {
            let found = self.bytes.get(self.pos).map(|&b| b as char).unwrap_or('-');
            return Err(ParseError::UnexpectedInput {
                line: self.line,
                found,
            });
        }

        // Tokens must be separated by whitespace.
        match self.bytes.get(self.pos) {
            None | Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => (),
            Some(&byte) => {
                return Err(ParseError::UnexpectedInput {
                    line: self.line,
                    found: byte as char,
                });
            }
        }

        let value = value as i64;
        Ok(Some(if negative { -value } else { value }))
    }

    fn parse_header(&mut self) -> Result<DimacsHeader, ParseError> {
        if !self.eat_word(b"p") || !self.eat_word(b"cnf") {
            return Err(ParseError::MissingHeader { line: self.line });
        }

        let var_count = match self.next_int()? {
            Some(value) if value >= 0 => value as usize,
            _ => return Err(ParseError::MissingHeader { line: self.line }),
        };

        if var_count > Var::max_count() {
            return Err(ParseError::HeaderVarCount {
                line: self.line,
                var_count,
            });
        }

        let clause_count = match self.next_int()? {
            Some(value) if value >= 0 => value as usize,
            _ => return Err(ParseError::MissingHeader { line: self.line }),
        };

        Ok(DimacsHeader {
            var_count,
            clause_count,
        })
    }
}

/// Write a DIMACS CNF header.
pub fn write_dimacs_header(target: &mut impl io::Write, header: DimacsHeader) -> io::Result<()> {
    writeln!(
        target,
        "p cnf {var_count} {clause_count}",
        var_count = header.var_count,
        clause_count = header.clause_count
    )
}

/// Write an iterator of clauses as headerless DIMACS CNF.
pub fn write_dimacs_clauses(
    target: &mut impl io::Write,
    clauses: impl IntoIterator<Item = impl IntoIterator<Item = impl Borrow<Lit>>>,
) -> io::Result<()> {
    for clause in clauses.into_iter() {
        for lit in clause.into_iter() {
            itoa::write(&mut *target, lit.borrow().to_dimacs())?;
            target.write_all(b" ")?;
        }
        target.write_all(b"0\n")?;
    }
    Ok(())
}

/// Write a formula as DIMACS CNF.
pub fn write_dimacs(target: &mut impl io::Write, formula: &CnfFormula) -> io::Result<()> {
    write_dimacs_header(
        &mut *target,
        DimacsHeader {
            var_count: formula.var_count(),
            clause_count: formula.len(),
        },
    )?;
    write_dimacs_clauses(&mut *target, formula.iter())
}
