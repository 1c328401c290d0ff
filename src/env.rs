use std::{cell::RefCell, ffi::OsStr};

use miette::Result;

use crate::error;

/// Process configuration read from the environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Env {
    /// `LC3_MINIMAL=1`: no status messages, no color.
    minimal: bool,
    /// `LC3_PC=<hex>`: address to start executing at.
    start_pc: Option<u16>,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

/// Must only be called *once* per process.
pub fn init() -> Result<()> {
    let start_pc = match std::env::var("LC3_PC") {
        Ok(value) => {
            Some(parse_address(&value).ok_or_else(|| error::env_bad_address("LC3_PC", &value))?)
        }
        Err(_) => None,
    };
    let value = Env {
        minimal: var_is("LC3_MINIMAL", "1"),
        start_pc,
    };
    set_env(value);
    Ok(())
}

pub fn is_minimal() -> bool {
    with_env(|env| env.minimal)
}

pub fn start_pc() -> Option<u16> {
    with_env(|env| env.start_pc)
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(&env)
    })
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}

/// Parse a hex address in LC-3 (`x3000`) or Rust (`0x3000`) notation, or bare hex digits.
fn parse_address(value: &str) -> Option<u16> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix(['x', 'X']))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16).ok()
}
