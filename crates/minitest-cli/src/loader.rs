//! Test module loading
//!
//! Loads compiled test modules (`cdylib`s built with `minitest_module!`) using
//! `libloading`. Dependencies the dynamic linker cannot find are resolved on
//! demand from the module's own directory, then the load is retried.
//!
//! # Safety
//!
//! Loading a module runs its initialization code and the registry it returns
//! holds closures compiled into that module. `ModuleHandle` keeps the library
//! mapped for as long as the registry exists and drops the registry first.
//!
//! Panics inside module code never unwind into the runner: the module's own
//! copy of `minitest` catches them and hands back an error instead.

use libloading::{Library, Symbol};
use minitest::export::{self, AbiVersionFn, ExportedRegisterFn, RegisterFn};
use minitest::{ModuleBuilder, ModuleDef};
use std::collections::HashMap;
use std::ffi::CStr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Module loading errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// The path does not name an existing file
    #[error("Module not found: {}", path.display())]
    InvalidPath { path: PathBuf },
    /// The dynamic linker rejected the module
    #[error("Failed to load module {}: {message}", path.display())]
    LoadFailed { path: PathBuf, message: String },
    /// A dependency could not be found next to the module
    #[error("Unresolved dependency '{name}' of module {} (searched {})", module.display(), searched.display())]
    UnresolvedDependency {
        module: PathBuf,
        name: String,
        searched: PathBuf,
    },
    /// A required symbol is missing from the module
    #[error("Symbol '{symbol}' not found in module {}", path.display())]
    SymbolNotFound { path: PathBuf, symbol: String },
    /// The module was built against an incompatible minitest
    #[error("Module {} was built for {found}, runner expects {expected}", path.display())]
    AbiMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
    /// The module's registration function panicked
    #[error("Registration of module {} panicked: {message}", path.display())]
    RegistrationPanicked { path: PathBuf, message: String },
}

/// A loaded test module.
///
/// Owns the module's registry and every library mapped for it. Field order is
/// drop order: the registry, then the module library, then its dependencies.
pub struct ModuleHandle {
    module: ModuleDef,
    library: Option<Library>,
    dependencies: Vec<Library>,
    path: PathBuf,
}

impl ModuleHandle {
    /// A handle for a module compiled into the current process
    pub fn in_process(path: impl Into<PathBuf>, register: RegisterFn) -> Result<Self, LoadError> {
        let path = path.into();
        let module = register_module(&path, |builder| {
            export::guarded_register(register, builder)
        })?;
        Ok(Self {
            module,
            library: None,
            dependencies: Vec::new(),
            path,
        })
    }

    /// File name used to label the module in reports
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn module(&self) -> &ModuleDef {
        &self.module
    }

    /// Number of dependency libraries resolved for this module
    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    /// Release the module and everything resolved for it
    pub fn unload(self) {
        tracing::debug!(
            module = %self.path.display(),
            dependencies = self.dependencies.len(),
            dynamic = self.library.is_some(),
            "unloading module"
        );
        drop(self);
    }
}

/// Source of loadable test modules
pub trait ModuleLoader {
    /// Load the module at `path`
    fn load(&self, path: &Path) -> Result<ModuleHandle, LoadError>;
}

/// Loads `cdylib` test modules from disk
#[derive(Debug, Clone, Default)]
pub struct LibraryLoader {
    /// Extra directories searched for dependencies after the module's own
    search_paths: Vec<PathBuf>,
}

impl LibraryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.search_paths.extend(paths);
        self
    }

    /// Find a dependency file by the name the dynamic linker asked for
    fn resolve_dependency(&self, module_dir: &Path, name: &str) -> Option<PathBuf> {
        let file_name = Path::new(name).file_name()?;
        std::iter::once(module_dir)
            .chain(self.search_paths.iter().map(PathBuf::as_path))
            .map(|dir| dir.join(file_name))
            .find(|candidate| candidate.is_file())
    }

    /// Open `path`, preloading missing dependencies from `module_dir` as the
    /// dynamic linker reports them
    fn open_with_dependencies(
        &self,
        path: &Path,
        module_dir: &Path,
        attempted: &mut Vec<String>,
        dependencies: &mut Vec<Library>,
    ) -> Result<Library, LoadError> {
        loop {
            // SAFETY: loading runs the library's initializers; test modules
            // are trusted code supplied by the user running the tests.
            match unsafe { Library::new(path) } {
                Ok(library) => return Ok(library),
                Err(err) => {
                    let message = err.to_string();
                    let Some(missing) = missing_dependency(&message) else {
                        return Err(LoadError::LoadFailed {
                            path: path.to_path_buf(),
                            message,
                        });
                    };
                    let unresolved = || LoadError::UnresolvedDependency {
                        module: path.to_path_buf(),
                        name: missing.to_string(),
                        searched: module_dir.to_path_buf(),
                    };
                    if attempted.iter().any(|name| name == missing) {
                        return Err(unresolved());
                    }
                    let Some(candidate) = self.resolve_dependency(module_dir, missing) else {
                        return Err(unresolved());
                    };
                    tracing::debug!(
                        dependency = %candidate.display(),
                        module = %path.display(),
                        "resolving dependency"
                    );
                    attempted.push(missing.to_string());
                    let dependency = self.open_with_dependencies(
                        &candidate,
                        module_dir,
                        attempted,
                        dependencies,
                    )?;
                    dependencies.push(dependency);
                }
            }
        }
    }
}

impl ModuleLoader for LibraryLoader {
    fn load(&self, path: &Path) -> Result<ModuleHandle, LoadError> {
        let full_path = path
            .canonicalize()
            .ok()
            .filter(|p| p.is_file())
            .ok_or_else(|| LoadError::InvalidPath {
                path: path.to_path_buf(),
            })?;
        let module_dir = full_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut dependencies = Vec::new();
        let library = self.open_with_dependencies(
            &full_path,
            &module_dir,
            &mut Vec::new(),
            &mut dependencies,
        )?;
        // Each dependency was pushed after the libraries it needs; reversing
        // makes the Vec drop dependents first.
        dependencies.reverse();

        check_abi(&library, &full_path)?;

        // SAFETY: the ABI tag matched, so the symbol was produced by
        // `minitest_module!` against this version of the registry types.
        let register: ExportedRegisterFn = unsafe {
            let symbol: Symbol<'_, ExportedRegisterFn> =
                library
                    .get(export::REGISTER_SYMBOL)
                    .map_err(|_| LoadError::SymbolNotFound {
                        path: full_path.clone(),
                        symbol: symbol_name(export::REGISTER_SYMBOL),
                    })?;
            *symbol
        };

        let module = register_module(&full_path, register)?;
        tracing::debug!(
            module = %full_path.display(),
            suites = module.suites().len(),
            dependencies = dependencies.len(),
            "loaded module"
        );

        Ok(ModuleHandle {
            module,
            library: Some(library),
            dependencies,
            path: full_path,
        })
    }
}

/// Serves modules compiled into the current process, keyed by path
#[derive(Clone, Default)]
pub struct StaticLoader {
    modules: HashMap<PathBuf, RegisterFn>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `register` loadable under `path`
    pub fn with_module(mut self, path: impl Into<PathBuf>, register: RegisterFn) -> Self {
        self.modules.insert(path.into(), register);
        self
    }
}

impl ModuleLoader for StaticLoader {
    fn load(&self, path: &Path) -> Result<ModuleHandle, LoadError> {
        let register = self
            .modules
            .get(path)
            .copied()
            .ok_or_else(|| LoadError::InvalidPath {
                path: path.to_path_buf(),
            })?;
        ModuleHandle::in_process(path, register)
    }
}

fn check_abi(library: &Library, path: &Path) -> Result<(), LoadError> {
    // SAFETY: the symbol type matches the one `minitest_module!` exports; the
    // returned pointer refers to a static NUL-terminated string.
    let found = unsafe {
        let abi: Symbol<'_, AbiVersionFn> =
            library
                .get(export::ABI_SYMBOL)
                .map_err(|_| LoadError::SymbolNotFound {
                    path: path.to_path_buf(),
                    symbol: symbol_name(export::ABI_SYMBOL),
                })?;
        CStr::from_ptr(abi()).to_string_lossy().into_owned()
    };

    if found == export::abi_tag() {
        Ok(())
    } else {
        Err(LoadError::AbiMismatch {
            path: path.to_path_buf(),
            expected: export::abi_tag().to_string(),
            found,
        })
    }
}

fn register_module<F>(path: &Path, register: F) -> Result<ModuleDef, LoadError>
where
    F: FnOnce(&mut ModuleBuilder) -> Result<(), String>,
{
    let mut builder = ModuleBuilder::new();
    register(&mut builder).map_err(|message| LoadError::RegistrationPanicked {
        path: path.to_path_buf(),
        message,
    })?;
    Ok(builder.build())
}

fn symbol_name(symbol: &[u8]) -> String {
    String::from_utf8_lossy(symbol.strip_suffix(b"\0").unwrap_or(symbol)).into_owned()
}

/// Name of the shared object the dynamic linker failed to find, if the error
/// is of that kind.
///
/// Recognizes the glibc/musl form (`libdep.so: cannot open shared object
/// file`) and the dyld form (`Library not loaded: @rpath/libdep.dylib`).
fn missing_dependency(message: &str) -> Option<&str> {
    const ELF_MARKER: &str = ": cannot open shared object file";
    const DYLD_MARKER: &str = "Library not loaded: ";

    if let Some(end) = message.find(ELF_MARKER) {
        let head = &message[..end];
        let start = head.rfind(|c: char| c == ' ' || c == ':').map_or(0, |i| i + 1);
        let name = head[start..].trim();
        return (!name.is_empty()).then_some(name);
    }

    if let Some(start) = message.find(DYLD_MARKER) {
        let tail = &message[start + DYLD_MARKER.len()..];
        let token = tail.split_whitespace().next()?;
        let name = token.rsplit('/').next().unwrap_or(token);
        return (!name.is_empty()).then_some(name);
    }

    None
}
