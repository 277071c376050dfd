//! Build script for zvaldump-core
//!
//! - Minimum Rust version (`Option::is_some_and` and let-else need 1.70.0)
//! - Warns on targets without a live-process accessor

fn main()
{
    match rustc_version::version() {
        Ok(found) => {
            let minimum = rustc_version::Version::new(1, 70, 0);
            if found < minimum {
                panic!("zvaldump-core requires Rust {minimum} or newer, found {found}");
            }
        }
        Err(_) => println!("cargo:warning=could not verify Rust version"),
    }

    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    if target_os != "linux" {
        println!(
            "cargo:warning=zvaldump-core has no live-process support on {target_os}; only custom MemoryAccessor implementations will work"
        );
    }
    let pointer_width = std::env::var("CARGO_CFG_TARGET_POINTER_WIDTH").unwrap_or_default();
    if pointer_width != "64" {
        println!("cargo:warning=the default Zend layout assumes an LP64 target");
    }
}
