// ── In-memory remote host ────────────────────────────────────────────────────
//
// `MemoryRemote` implements the remote capability against a simulated
// Windows file system. It understands exactly the v1 protocol commands
// (stream open / write / close / dispose / remove-variable, restore script,
// cleanup script), keeps PowerShell variables per shell, records every
// command per shell, and can be told to fail shells or commands.

use crate::error::{CopyError, CopyErrorKind, CopyResult};
use crate::remote::{OutputStream, RemoteClient, RemoteCommand, RemoteShell};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

/// Directory `$env:TEMP` and `%TEMP%` resolve to.
pub const TEMP_DIR: &str = "C:\\Temp";

/// Directory relative paths resolve against.
pub const WORKING_DIR: &str = "C:\\Users\\winrmcp";

/// Exit code the simulated interpreter uses for an unhandled error.
pub const SCRIPT_ERROR_EXIT_CODE: i32 = 1;

/// Exit code used when the restore script hits undecodable base64.
pub const DECODE_ERROR_EXIT_CODE: i32 = 3;

struct Patterns {
    open_stream: Regex,
    write_line: Regex,
    close_stream: Regex,
    dispose_stream: Regex,
    remove_variable: Regex,
    full_path: Regex,
    full_path_trimmed: Regex,
}

lazy_static! {
    static ref PATTERNS: Patterns = Patterns {
        open_stream: Regex::new(
            r#"^\$(\w+) = New-Object -TypeName System\.IO\.StreamWriter -ArgumentList "(.*)", \$true, \(\[System\.Text\.Encoding\]::UTF8\)$"#
        )
        .unwrap(),
        write_line: Regex::new(r#"^\$(\w+)\.WriteLine\("(.*)"\)$"#).unwrap(),
        close_stream: Regex::new(r"^\$(\w+)\.Close\(\)$").unwrap(),
        dispose_stream: Regex::new(r"^\$(\w+)\.Dispose\(\)$").unwrap(),
        remove_variable: Regex::new(r"^Remove-Variable -Name (\w+)$").unwrap(),
        full_path: Regex::new(r#"GetFullPath\("([^"]*)"\)"#).unwrap(),
        full_path_trimmed: Regex::new(r#"GetFullPath\("([^"]*)"\.Trim\("'"\)\)"#).unwrap(),
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File(Vec<u8>),
    Dir,
}

/// Everything one shell saw.
#[derive(Debug, Clone, Default)]
pub struct ShellRecord {
    pub commands: Vec<String>,
    pub close_count: usize,
}

impl ShellRecord {
    pub fn chunk_writes(&self) -> usize {
        self.commands.iter().filter(|c| c.contains(".WriteLine(")).count()
    }
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    needle: String,
    skip: usize,
    exit_code: i32,
    fired: bool,
}

#[derive(Debug, Clone)]
struct StreamVar {
    path: String,
    closed: bool,
}

#[derive(Debug, Default)]
struct HostState {
    fs: BTreeMap<String, Entry>,
    shells: Vec<ShellRecord>,
    variables: HashMap<(usize, String), StreamVar>,
    failures: Vec<InjectedFailure>,
    refuse_shells_after: Option<usize>,
    commands_on_closed_shells: usize,
}

/// Simulated remote host. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    state: Arc<Mutex<HostState>>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        let remote = Self {
            state: Arc::new(Mutex::new(HostState::default())),
        };
        remote.mkdir("C:\\");
        remote.mkdir(TEMP_DIR);
        remote.mkdir(WORKING_DIR);
        remote
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HostState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // ── File system setup / inspection ───────────────────────────────

    /// Create a directory and all its ancestors.
    pub fn mkdir(&self, path: &str) {
        let path = full_path(path);
        mkdir_all(&mut self.lock().fs, &path);
    }

    pub fn put_file(&self, path: &str, content: &[u8]) {
        let path = full_path(path);
        let mut state = self.lock();
        if let Some(parent) = parent_dir(&path) {
            mkdir_all(&mut state.fs, &parent);
        }
        state.fs.insert(path, Entry::File(content.to_vec()));
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        match self.lock().fs.get(&full_path(path)) {
            Some(Entry::File(data)) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(self.lock().fs.get(&full_path(path)), Some(Entry::Dir))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.lock().fs.contains_key(&full_path(path))
    }

    /// Files left in the temp directory.
    pub fn temp_files(&self) -> Vec<String> {
        let prefix = format!("{}\\", TEMP_DIR);
        self.lock()
            .fs
            .iter()
            .filter(|(path, entry)| path.starts_with(&prefix) && matches!(entry, Entry::File(_)))
            .map(|(path, _)| path.clone())
            .collect()
    }

    // ── Shell inspection ─────────────────────────────────────────────

    pub fn shells(&self) -> Vec<ShellRecord> {
        self.lock().shells.clone()
    }

    /// Chunk writes per shell, for shells that wrote at least one chunk or
    /// belong to the upload (restore and cleanup shells write none).
    pub fn chunk_writes_per_shell(&self) -> Vec<usize> {
        self.lock().shells.iter().map(|s| s.chunk_writes()).collect()
    }

    /// Stream variables still bound in any shell.
    pub fn live_variables(&self) -> usize {
        self.lock().variables.len()
    }

    /// Commands submitted to a shell after it was closed.
    pub fn commands_on_closed_shells(&self) -> usize {
        self.lock().commands_on_closed_shells
    }

    // ── Failure injection ────────────────────────────────────────────

    /// Make the `nth` (0-based) command containing `needle` exit with `exit_code`.
    pub fn fail_command(&self, needle: &str, nth: usize, exit_code: i32) {
        self.lock().failures.push(InjectedFailure {
            needle: needle.to_string(),
            skip: nth,
            exit_code,
            fired: false,
        });
    }

    /// Refuse to open shells once `opened` shells exist.
    pub fn refuse_shells_after(&self, opened: usize) {
        self.lock().refuse_shells_after = Some(opened);
    }

    // ── Command execution ────────────────────────────────────────────

    fn execute_in(&self, shell_id: usize, command: &str) -> CopyResult<Output> {
        let mut state = self.lock();
        let record = state
            .shells
            .get_mut(shell_id)
            .ok_or_else(|| CopyError::new(CopyErrorKind::CommandFailed, "unknown shell"))?;
        if record.close_count > 0 {
            state.commands_on_closed_shells += 1;
            return Err(CopyError::new(
                CopyErrorKind::CommandFailed,
                format!("shell {} is closed", shell_id),
            ));
        }
        record.commands.push(command.to_string());

        if let Some(code) = take_injected_failure(&mut state.failures, command) {
            return Ok(Output::failed(code, "injected failure"));
        }
        Ok(interpret(&mut state, shell_id, command))
    }
}

fn take_injected_failure(failures: &mut [InjectedFailure], command: &str) -> Option<i32> {
    for failure in failures.iter_mut() {
        if failure.fired || !command.contains(&failure.needle) {
            continue;
        }
        if failure.skip > 0 {
            failure.skip -= 1;
            continue;
        }
        failure.fired = true;
        return Some(failure.exit_code);
    }
    None
}

// ── Capability implementation ────────────────────────────────────────

#[async_trait]
impl RemoteClient for MemoryRemote {
    async fn create_shell(&self) -> CopyResult<Arc<dyn RemoteShell>> {
        let id = {
            let mut state = self.lock();
            if let Some(limit) = state.refuse_shells_after {
                if state.shells.len() >= limit {
                    return Err(CopyError::session_creation("shell quota exceeded"));
                }
            }
            state.shells.push(ShellRecord::default());
            state.shells.len() - 1
        };
        Ok(Arc::new(MemoryShell {
            remote: self.clone(),
            id,
        }))
    }
}

struct MemoryShell {
    remote: MemoryRemote,
    id: usize,
}

#[async_trait]
impl RemoteShell for MemoryShell {
    async fn execute(&self, command: &str) -> CopyResult<Box<dyn RemoteCommand>> {
        let output = self.remote.execute_in(self.id, command)?;
        Ok(Box::new(MemoryCommand {
            stdout: Some(Box::new(Cursor::new(output.stdout))),
            stderr: Some(Box::new(Cursor::new(output.stderr))),
            exit_code: output.exit_code,
            finished: false,
        }))
    }

    async fn close(&self) -> CopyResult<()> {
        let mut state = self.remote.lock();
        state.variables.retain(|(shell, _), _| *shell != self.id);
        if let Some(record) = state.shells.get_mut(self.id) {
            record.close_count += 1;
        }
        Ok(())
    }
}

struct MemoryCommand {
    stdout: Option<OutputStream>,
    stderr: Option<OutputStream>,
    exit_code: i32,
    finished: bool,
}

#[async_trait]
impl RemoteCommand for MemoryCommand {
    fn take_stdout(&mut self) -> Option<OutputStream> {
        self.stdout.take()
    }

    fn take_stderr(&mut self) -> Option<OutputStream> {
        self.stderr.take()
    }

    async fn wait(&mut self) -> CopyResult<()> {
        tokio::task::yield_now().await;
        self.finished = true;
        Ok(())
    }

    fn exit_code(&self) -> i32 {
        if self.finished {
            self.exit_code
        } else {
            -1
        }
    }
}

// ── Interpreter ──────────────────────────────────────────────────────

struct Output {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: i32,
}

impl Output {
    fn ok() -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: 0,
        }
    }

    fn failed(exit_code: i32, message: &str) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: format!("{}\r\n", message).into_bytes(),
            exit_code,
        }
    }
}

fn interpret(state: &mut HostState, shell_id: usize, command: &str) -> Output {
    let patterns = &*PATTERNS;

    if let Some(caps) = patterns.open_stream.captures(command) {
        return open_stream(state, shell_id, &caps[1], &caps[2]);
    }
    if let Some(caps) = patterns.write_line.captures(command) {
        return write_line(state, shell_id, &caps[1], &caps[2]);
    }
    if let Some(caps) = patterns.close_stream.captures(command) {
        return match state.variables.get_mut(&(shell_id, caps[1].to_string())) {
            Some(var) => {
                var.closed = true;
                Output::ok()
            }
            None => null_valued(&caps[1]),
        };
    }
    if let Some(caps) = patterns.dispose_stream.captures(command) {
        return match state.variables.get(&(shell_id, caps[1].to_string())) {
            Some(_) => Output::ok(),
            None => null_valued(&caps[1]),
        };
    }
    if let Some(caps) = patterns.remove_variable.captures(command) {
        return match state.variables.remove(&(shell_id, caps[1].to_string())) {
            Some(_) => Output::ok(),
            None => Output::failed(
                SCRIPT_ERROR_EXIT_CODE,
                &format!("Cannot find a variable with the name '{}'.", &caps[1]),
            ),
        };
    }
    if command.contains("$dest_file_path = ") {
        let tmp = patterns.full_path.captures(command).map(|c| c[1].to_string());
        let dest = patterns.full_path_trimmed.captures(command).map(|c| c[1].to_string());
        return match (tmp, dest) {
            (Some(tmp), Some(dest)) => restore(state, &tmp, &dest),
            _ => Output::failed(SCRIPT_ERROR_EXIT_CODE, "malformed restore script"),
        };
    }
    if command.contains("Remove-Item $tmp_file_path") {
        return match patterns.full_path.captures(command) {
            Some(caps) => cleanup(state, &caps[1]),
            None => Output::failed(SCRIPT_ERROR_EXIT_CODE, "malformed cleanup script"),
        };
    }

    Output::failed(
        SCRIPT_ERROR_EXIT_CODE,
        &format!("The term '{}' is not recognized", command.trim()),
    )
}

fn null_valued(variable: &str) -> Output {
    Output::failed(
        SCRIPT_ERROR_EXIT_CODE,
        &format!(
            "You cannot call a method on a null-valued expression (${}).",
            variable
        ),
    )
}

fn open_stream(state: &mut HostState, shell_id: usize, variable: &str, path: &str) -> Output {
    let path = full_path(path);
    match state.fs.get(&path) {
        Some(Entry::Dir) => {
            return Output::failed(
                SCRIPT_ERROR_EXIT_CODE,
                &format!("Access to the path '{}' is denied.", path),
            )
        }
        Some(Entry::File(_)) => {}
        None => {
            let parent_ok = parent_dir(&path)
                .map(|p| matches!(state.fs.get(&p), Some(Entry::Dir)))
                .unwrap_or(false);
            if !parent_ok {
                return Output::failed(
                    SCRIPT_ERROR_EXIT_CODE,
                    &format!("Could not find a part of the path '{}'.", path),
                );
            }
            state.fs.insert(path.clone(), Entry::File(Vec::new()));
        }
    }
    state.variables.insert(
        (shell_id, variable.to_string()),
        StreamVar { path, closed: false },
    );
    Output::ok()
}

fn write_line(state: &mut HostState, shell_id: usize, variable: &str, content: &str) -> Output {
    let path = match state.variables.get(&(shell_id, variable.to_string())) {
        Some(var) if !var.closed => var.path.clone(),
        Some(_) => {
            return Output::failed(SCRIPT_ERROR_EXIT_CODE, "Cannot write to a closed TextWriter.")
        }
        None => return null_valued(variable),
    };
    match state.fs.get_mut(&path) {
        Some(Entry::File(data)) => {
            data.extend_from_slice(content.as_bytes());
            data.extend_from_slice(b"\r\n");
            Output::ok()
        }
        _ => Output::failed(
            SCRIPT_ERROR_EXIT_CODE,
            &format!("Could not find file '{}'.", path),
        ),
    }
}

fn restore(state: &mut HostState, tmp: &str, dest: &str) -> Output {
    let tmp = full_path(tmp);
    let dest = full_path(dest.trim_matches('\''));

    match state.fs.get(&dest) {
        Some(Entry::Dir) => return Output::failed(1, ""),
        Some(Entry::File(_)) => {
            state.fs.remove(&dest);
        }
        None => {
            if let Some(parent) = parent_dir(&dest) {
                mkdir_all(&mut state.fs, &parent);
            }
        }
    }

    let restored = match state.fs.get(&tmp) {
        Some(Entry::File(encoded)) => {
            let mut decoded = Vec::new();
            for line in encoded.split(|b| *b == b'\n') {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                if line.is_empty() {
                    continue;
                }
                match STANDARD.decode(line) {
                    Ok(bytes) => decoded.extend_from_slice(&bytes),
                    Err(e) => {
                        return Output::failed(
                            DECODE_ERROR_EXIT_CODE,
                            &format!("Invalid base64 line: {}", e),
                        )
                    }
                }
            }
            decoded
        }
        _ => Vec::new(),
    };
    state.fs.insert(dest, Entry::File(restored));
    Output::ok()
}

fn cleanup(state: &mut HostState, tmp: &str) -> Output {
    let tmp = full_path(tmp);
    if let Some(Entry::File(_)) = state.fs.get(&tmp) {
        state.fs.remove(&tmp);
    }
    Output::ok()
}

// ── Paths ────────────────────────────────────────────────────────────

/// Resolve a path the way `[System.IO.Path]::GetFullPath` would on the host.
pub fn full_path(path: &str) -> String {
    let expanded = path
        .replace("$env:TEMP", TEMP_DIR)
        .replace("%TEMP%", TEMP_DIR)
        .replace('/', "\\");

    let absolute = if expanded.len() >= 2 && expanded.as_bytes()[1] == b':' {
        expanded
    } else {
        format!("{}\\{}", WORKING_DIR, expanded.trim_start_matches('\\'))
    };

    let mut parts: Vec<&str> = Vec::new();
    for part in absolute.split('\\') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.len() > 1 {
                    parts.pop();
                }
            }
            other => parts.push(other),
        }
    }
    if parts.len() == 1 {
        format!("{}\\", parts[0])
    } else {
        parts.join("\\")
    }
}

fn parent_dir(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('\\');
    let idx = trimmed.rfind('\\')?;
    if idx == 2 {
        // "C:\x" -> "C:\"
        Some(trimmed[..=idx].to_string())
    } else {
        Some(trimmed[..idx].to_string())
    }
}

fn mkdir_all(fs: &mut BTreeMap<String, Entry>, path: &str) {
    if let Some(parent) = parent_dir(path) {
        if parent != path {
            mkdir_all(fs, &parent);
        }
    }
    fs.entry(path.to_string()).or_insert(Entry::Dir);
}
