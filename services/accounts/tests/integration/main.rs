mod binder_test;
mod helpers;
