mod common;
mod project_repository_tests;
