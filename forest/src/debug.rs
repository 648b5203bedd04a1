/// Verbose tracing for lock protocols, compiled out unless the
/// `extra_verbose_debug_logging` feature is enabled
#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {
        if cfg!(feature = "extra_verbose_debug_logging") {
            println!(
                "{:?} [{}]: {}",
                std::thread::current().id(),
                module_path!(),
                format!($($arg)*)
            );
        }
    };
}
