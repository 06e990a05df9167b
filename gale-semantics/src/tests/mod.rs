//! Test suite for the Gale semantic core
//!
//! Unit tests per module plus end-to-end scenario tests driving whole
//! programs through `analyze_program`.

mod test_coercion;
mod test_lambdas;
mod test_node_stack;
mod test_overloads;
mod test_programs;
mod test_struct_init;
mod test_type_classes;
