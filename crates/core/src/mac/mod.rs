/// Lazily parses a configuration value from an environment variable.
///
/// Falls back to `$default`, or to the type's default value when none is
/// given, if the variable is unset or does not parse as `$t`.
#[macro_export]
macro_rules! lazy_env_parse {
	($key:expr_2021, $t:ty) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or_default()
		})
	};
	($key:expr_2021, $t:ty, $default:expr_2021) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.trim().parse::<$t>().ok()).unwrap_or($default)
		})
	};
}
