//! Unit tests for the pull request bounded context.

mod repository_tests;
