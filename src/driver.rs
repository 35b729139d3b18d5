//C toolchain side of the translator: write the generated unit, compile it with the
//runtime and run the result
//the C compiler is the one cc picks for the target triple, the runtime directory
//must hold wich.h and wich.c

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

use crate::Backend;

pub const RUNTIME_HEADER: &str = "wich.h";
pub const RUNTIME_SOURCE: &str = "wich.c";

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub backend: Backend,
    pub runtime_dir: PathBuf,
    pub work_dir: PathBuf,
    pub target: String,
}

//generated files are named after the input without its extension
pub fn base_name(input: &Path) -> String {
    input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("a")
        .to_string()
}

impl DriverConfig {
    pub fn c_path(&self, base: &str) -> PathBuf {
        self.work_dir.join(format!("{}.c", base))
    }

    pub fn exe_path(&self, base: &str) -> PathBuf {
        if self.target.contains("windows") {
            self.work_dir.join(format!("{}.exe", base))
        } else {
            self.work_dir.join(base)
        }
    }

    fn check_runtime(&self) -> Result<PathBuf> {
        for file in [RUNTIME_HEADER, RUNTIME_SOURCE] {
            let path = self.runtime_dir.join(file);
            if !path.is_file() {
                bail!(
                    "runtime file {} not found, point --runtime or WICH_RUNTIME at the wich runtime",
                    path.display()
                );
            }
        }
        Ok(self.runtime_dir.join(RUNTIME_SOURCE))
    }
}

pub fn write_c_file(config: &DriverConfig, base: &str, c_source: &str) -> Result<PathBuf> {
    fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("cannot create work dir {}", config.work_dir.display()))?;
    let path = config.c_path(base);
    fs::write(&path, c_source).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(path)
}

pub fn compile_c(config: &DriverConfig, c_file: &Path, base: &str) -> Result<PathBuf> {
    let runtime_source = config.check_runtime()?;
    let exe = config.exe_path(base);

    let tool = cc::Build::new()
        .target(&config.target)
        .host(&config.target)
        .opt_level(0)
        .debug(true)
        .cargo_metadata(false)
        .try_get_compiler()
        .with_context(|| format!("no C compiler found for target {}", config.target))?;
    if tool.is_like_msvc() {
        bail!("the generated C99 needs a gcc or clang style compiler, found {}", tool.path().display());
    }

    let mut cmd = tool.to_command();
    cmd.arg("-std=c99")
        .arg("-I")
        .arg(&config.runtime_dir)
        .arg(c_file)
        .arg(&runtime_source)
        .arg("-o")
        .arg(&exe);
    let output = cmd
        .output()
        .with_context(|| format!("failed to run C compiler {}", tool.path().display()))?;
    if !output.status.success() {
        bail!(
            "C compiler exited with {} for {}:\n{}",
            output.status,
            c_file.display(),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(exe)
}

//runs a built program and returns what it printed
pub fn run_executable(exe: &Path) -> Result<String> {
    let output = Command::new(exe)
        .output()
        .with_context(|| format!("failed to execute {}", exe.display()))?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        bail!(
            "{} exited with {}:\n{}",
            exe.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(stdout)
}

pub fn build(config: &DriverConfig, input: &Path, c_source: &str) -> Result<PathBuf> {
    let base = base_name(input);
    let c_file = write_c_file(config, &base, c_source)?;
    compile_c(config, &c_file, &base)
}
