use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use boa_lang::interpreter::{run_and_capture, Interpreter};
use boa_lang::{BoaError, Value};

/// Run a program in a fresh interpreter and return its captured output.
#[allow(dead_code)]
pub fn run(source: &str) -> String {
    run_and_capture(source).expect("program should run")
}

/// Run a program and return the value of its last statement.
#[allow(dead_code)]
pub fn run_value(source: &str) -> Value {
    let mut interp = Interpreter::new();
    interp.capture_output();
    interp.run(source, "<test>").expect("program should run")
}

/// Run a program and return the error it fails with.
#[allow(dead_code)]
pub fn run_err(source: &str) -> BoaError {
    let mut interp = Interpreter::new();
    interp.capture_output();
    interp
        .run(source, "<test>")
        .expect_err("program should fail")
}

/// A `.boa` fixture in a per-test temp directory, removed on drop.
#[allow(dead_code)]
pub struct TempModule {
    pub dir: PathBuf,
    files: Vec<PathBuf>,
}

#[allow(dead_code)]
impl TempModule {
    pub fn new(test_name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("boa_test_{}_{}", test_name, std::process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");
        Self { dir, files: Vec::new() }
    }

    pub fn write(&mut self, module_name: &str, source: &str) -> &mut Self {
        let path = self.dir.join(format!("{}.boa", module_name));
        let mut file = File::create(&path).expect("create module file");
        file.write_all(source.as_bytes()).expect("write module file");
        self.files.push(path);
        self
    }

    /// An interpreter whose import base directory is this temp directory.
    pub fn interpreter(&self) -> Interpreter {
        let mut interp = Interpreter::new();
        interp.set_base_dir(&self.dir);
        interp
    }
}

impl Drop for TempModule {
    fn drop(&mut self) {
        for file in &self.files {
            let _ = fs::remove_file(file);
        }
        let _ = fs::remove_dir(&self.dir);
    }
}
