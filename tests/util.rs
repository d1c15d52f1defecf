//! Shared test utilities for integration tests
//!
//! A scripted stand-in for cscope/readtags and a copy of the small C
//! project under tests/fixtures.

#![allow(dead_code)]

use std::{cell::RefCell, collections::HashMap};

use assert_fs::prelude::*;
use callscope::core::{
    cancel::CancelToken,
    process::{CommandRunner, Invocation, ProcessOutput},
    query::TAG_FORMAT,
};

/// Answers commands by their argument line. Unknown commands succeed
/// with empty output, like a query that matched nothing.
#[derive(Default)]
pub struct Scripted
{
    answers: HashMap<String, ProcessOutput>,
    cancel_on: Option<(String, CancelToken)>,
    pub seen: RefCell<Vec<String>>,
}

impl Scripted
{
    pub fn answer(
        mut self,
        args: &str,
        out: ProcessOutput,
    ) -> Self
    {
        self.answers
            .insert(args.to_string(), out);
        self
    }

    /// `cscope -d -f cscope.out -L<code> <symbol>` answer
    pub fn cscope(
        self,
        code: u8,
        symbol: &str,
        stdout: &str,
    ) -> Self
    {
        self.answer(&format!("-d -f cscope.out -L{code} {symbol}"), ProcessOutput::ok(stdout))
    }

    /// `readtags` answer for `symbol`
    pub fn tags(
        self,
        symbol: &str,
        stdout: &str,
    ) -> Self
    {
        self.answer(&format!("-t ctags.out -F {TAG_FORMAT} {symbol}"), ProcessOutput::ok(stdout))
    }

    /// Trip `token` when a command with these arguments runs.
    pub fn cancel_when(
        mut self,
        args: &str,
        token: &CancelToken,
    ) -> Self
    {
        self.cancel_on = Some((args.to_string(), token.clone()));
        self
    }

    pub fn ran(
        &self,
        needle: &str,
    ) -> bool
    {
        self.seen
            .borrow()
            .iter()
            .any(|c| c.contains(needle))
    }
}

impl CommandRunner for Scripted
{
    fn run(
        &self,
        inv: &Invocation,
    ) -> std::io::Result<ProcessOutput>
    {
        let key = inv.args_line();

        self.seen
            .borrow_mut()
            .push(inv.to_string());

        if let Some((args, token)) = &self.cancel_on
            && *args == key
        {
            token.cancel();
        }

        Ok(self
            .answers
            .get(&key)
            .cloned()
            .unwrap_or_else(|| ProcessOutput::ok("")))
    }
}

/// Temporary copy of tests/fixtures/c_project.
pub fn c_project() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    tmp.copy_from("tests/fixtures/c_project", &["**/*"])
        .expect("copy fixture");

    tmp
}
