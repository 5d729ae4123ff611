mod common;

mod admin_api_tests;
mod answers_api_tests;
