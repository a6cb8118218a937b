//! Support code for the `chordscope` command-line tool

pub mod output;
