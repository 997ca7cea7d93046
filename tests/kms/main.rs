mod key_store_test;
mod persistence_test;
