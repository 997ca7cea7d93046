mod context_test;
