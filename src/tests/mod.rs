// Test modules for vetchat
// Each module covers the corresponding source module

mod support;

mod room_list_tests;
mod service_tests;
mod settings_tests;
