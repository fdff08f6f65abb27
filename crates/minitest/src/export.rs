//! Symbols a compiled test module exports to the runner
//!
//! A test module is a `cdylib` that invokes [`minitest_module!`] once with its
//! registration function. The runner checks the ABI tag first and refuses
//! modules built against a different `minitest`, since the registry crosses
//! the library boundary as plain Rust types.
//!
//! A panic raised while registering is caught inside the module and comes back
//! as an error message, because an unwind cannot cross into the runner's copy
//! of the standard library.
//!
//! ```ignore
//! fn register(module: &mut minitest::ModuleBuilder) {
//!     module.suite(minitest::SuiteBuilder::<MyTests>::default_constructed());
//! }
//!
//! minitest::minitest_module!(register);
//! ```
//!
//! [`minitest_module!`]: crate::minitest_module

use crate::invoke::panic_message;
use crate::registry::ModuleBuilder;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};

/// NUL-terminated tag identifying the registry layout
pub const ABI_VERSION: &str = concat!("minitest/", env!("CARGO_PKG_VERSION"), "/abi2\0");

/// Name of the exported ABI tag function
pub const ABI_SYMBOL: &[u8] = b"minitest_abi_version\0";

/// Name of the exported registration function
pub const REGISTER_SYMBOL: &[u8] = b"minitest_register\0";

/// Signature of the exported ABI tag function
pub type AbiVersionFn = unsafe extern "C" fn() -> *const c_char;

/// Signature of a module's registration function
pub type RegisterFn = fn(&mut ModuleBuilder);

/// Signature of the exported registration symbol; `Err` carries a panic message
pub type ExportedRegisterFn = fn(&mut ModuleBuilder) -> Result<(), String>;

/// Run a registration function, reporting a panic as its message
pub fn guarded_register(register: RegisterFn, module: &mut ModuleBuilder) -> Result<(), String> {
    panic::catch_unwind(AssertUnwindSafe(|| register(module)))
        .map_err(|payload| panic_message(payload.as_ref()))
}

/// The ABI tag without its trailing NUL
pub fn abi_tag() -> &'static str {
    ABI_VERSION.trim_end_matches('\0')
}

/// Export a registration function from a test module
#[macro_export]
macro_rules! minitest_module {
    ($register:path) => {
        #[no_mangle]
        pub extern "C" fn minitest_abi_version() -> *const ::std::os::raw::c_char {
            $crate::export::ABI_VERSION.as_ptr().cast()
        }

        #[no_mangle]
        pub fn minitest_register(module: &mut $crate::ModuleBuilder) -> Result<(), String> {
            $crate::export::guarded_register($register, module)
        }
    };
}
