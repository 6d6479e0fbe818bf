//! Purpose: Flat C surface for P/Invoke-style bindings (libdepotbridge).
//! Exports: C-callable session/command/iterator functions plus buffer/string helpers.
//! Role: Stable ABI; opaque handles in, integer status and out-params back.
//! Invariants: No panic crosses this boundary; faults become safe default returns.
//! Invariants: Every handle, buffer, and string allocated here has a matching
//! null-safe free function, and freeing null is always a no-op.
//! Invariants: Process-wide state (last connection error, env store, engine
//! factory) lives in one `Runtime` struct behind a lock, never loose statics.
#![allow(non_camel_case_types)]
#![allow(clippy::not_unsafe_ptr_arg_deref)]

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use crate::api::{
    is_ignored, to_code, EnvStore, ErrorKind, MergeData, MergeForce, MergeStatus, ProtocolEngine,
    ResolveData, Session, Severity, TaggedCursor,
};
use crate::core::log::init_trace;

type DynEngine = Box<dyn ProtocolEngine>;
type EngineFactory = Box<dyn Fn() -> DynEngine + Send>;

// Handle types -----------------------------------------------------------------

#[repr(C)]
pub struct dpb_session {
    session: Session<DynEngine>,
}

#[repr(C)]
pub struct dpb_tagged_iter {
    cursor: TaggedCursor,
    current_len: i32,
}

#[repr(C)]
pub struct dpb_buf {
    pub data: *mut u8,
    pub len: usize,
}

/// One node of a message chain. `next` is null at the tail; the whole chain is
/// released through `dpb_message_free` on the head.
#[repr(C)]
pub struct dpb_message {
    severity: i32,
    code: i32,
    text: *mut c_char,
    next: *mut dpb_message,
}

/// Borrowed merge state passed to resolve callbacks; valid only for the
/// duration of the callback invocation.
#[repr(C)]
pub struct dpb_merge {
    data: *const MergeData,
}

/// Borrowed action-resolve state (branch/delete/filetype resolves); same
/// callback-scoped lifetime as `dpb_merge`.
#[repr(C)]
pub struct dpb_resolve {
    data: *const ResolveData,
}

// Callback function-pointer types ----------------------------------------------

pub type dpb_log_fn = extern "C" fn(level: c_int, file: *const c_char, line: c_int, msg: *const c_char);
pub type dpb_tagged_fn = extern "C" fn(cmd_id: c_int, key: *const c_char, value: *const c_char);
pub type dpb_error_fn = extern "C" fn(cmd_id: c_int, severity: c_int, code: c_int, msg: *const c_char);
pub type dpb_info_fn = extern "C" fn(cmd_id: c_int, level: c_int, code: c_int, msg: *const c_char);
pub type dpb_text_fn = extern "C" fn(cmd_id: c_int, data: *const u8, len: usize);
pub type dpb_binary_fn = extern "C" fn(cmd_id: c_int, data: *const u8, len: usize);
/// Writes the response into `out` (nul-terminated, capacity `out_len`);
/// returns negative to decline the prompt.
pub type dpb_prompt_fn =
    extern "C" fn(cmd_id: c_int, msg: *const c_char, echo: c_int, out: *mut c_char, out_len: usize) -> c_int;
pub type dpb_transfer_fn = extern "C" fn(cmd_id: c_int, done: u64, total: u64);
/// Returns a `MergeStatus` code deciding the resolve.
pub type dpb_resolve_fn = extern "C" fn(cmd_id: c_int, merge: *const dpb_merge) -> c_int;
/// Returns a `MergeStatus` code deciding an action resolve.
pub type dpb_action_resolve_fn = extern "C" fn(cmd_id: c_int, resolve: *const dpb_resolve) -> c_int;

// Process-wide runtime ---------------------------------------------------------

struct Runtime {
    last_connect_error: Option<(i32, i32, String)>,
    env: EnvStore,
    factory: Option<EngineFactory>,
}

fn runtime() -> &'static Mutex<Runtime> {
    static RUNTIME: OnceLock<Mutex<Runtime>> = OnceLock::new();
    RUNTIME.get_or_init(|| {
        Mutex::new(Runtime {
            last_connect_error: None,
            env: EnvStore::new(),
            factory: None,
        })
    })
}

fn lock_runtime() -> MutexGuard<'static, Runtime> {
    runtime().lock().unwrap_or_else(PoisonError::into_inner)
}

/// Register how `dpb_session_new` obtains its engine. Embedders that link the
/// real client engine call this once at startup; tests install a scripted one.
pub fn register_engine_factory(factory: impl Fn() -> DynEngine + Send + 'static) {
    lock_runtime().factory = Some(Box::new(factory));
}

/// Point the process-wide environment store at an explicit persisted file.
pub fn set_env_store(env: EnvStore) {
    lock_runtime().env = env;
}

/// Drop process-wide state: connection-error slot, engine factory, and the
/// environment store (overrides included). Intended for embedder teardown.
#[unsafe(no_mangle)]
pub extern "C" fn dpb_runtime_reset() {
    let mut runtime = lock_runtime();
    runtime.last_connect_error = None;
    runtime.factory = None;
    runtime.env = EnvStore::new();
}

// Guard helpers ----------------------------------------------------------------

fn guarded<T>(name: &str, default: T, f: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            tracing::error!(function = name, "panic contained at ABI boundary");
            default
        }
    }
}

fn borrow_session<'a>(session: *mut dpb_session) -> Option<&'a mut dpb_session> {
    if session.is_null() {
        return None;
    }
    Some(unsafe { &mut *session })
}

fn borrow_iter<'a>(iter: *mut dpb_tagged_iter) -> Option<&'a mut dpb_tagged_iter> {
    if iter.is_null() {
        return None;
    }
    Some(unsafe { &mut *iter })
}

fn cstr_arg(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

fn opt_cstr_arg(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(cstr_arg(ptr))
    }
}

fn c_string(input: &str) -> CString {
    let bytes: Vec<u8> = input.bytes().filter(|byte| *byte != 0).collect();
    CString::new(bytes).unwrap_or_default()
}

/// Allocate a caller-owned C string; empty input returns null, matching the
/// "nothing to say" convention of the attribute getters.
fn alloc_string(input: &str) -> *mut c_char {
    if input.is_empty() {
        return ptr::null_mut();
    }
    c_string(input).into_raw()
}

fn write_buf(out: *mut dpb_buf, bytes: &[u8]) {
    if out.is_null() {
        return;
    }
    unsafe {
        let buf = &mut *out;
        if bytes.is_empty() {
            buf.data = ptr::null_mut();
            buf.len = 0;
            return;
        }
        let mut data = bytes.to_vec().into_boxed_slice();
        buf.len = data.len();
        buf.data = data.as_mut_ptr();
        std::mem::forget(data);
    }
}

fn set_connect_error(severity: Severity, code: i32, text: String) {
    lock_runtime().last_connect_error = Some((severity.code(), code, text));
}

// Session lifecycle ------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn dpb_session_new(
    endpoint: *const c_char,
    user: *const c_char,
    credential: *const c_char,
    workspace: *const c_char,
    out_session: *mut *mut dpb_session,
) -> i32 {
    guarded("dpb_session_new", -1, || {
        if out_session.is_null() {
            return -1;
        }
        let engine = {
            let runtime = lock_runtime();
            runtime.factory.as_ref().map(|factory| factory())
        };
        let Some(engine) = engine else {
            set_connect_error(
                Severity::Failed,
                to_code(ErrorKind::Connect),
                "no protocol engine registered".to_string(),
            );
            return -1;
        };
        let session = Session::new(
            &cstr_arg(endpoint),
            &cstr_arg(user),
            &cstr_arg(credential),
            &cstr_arg(workspace),
            engine,
        );
        let handle = Box::new(dpb_session { session });
        unsafe {
            *out_session = Box::into_raw(handle);
        }
        0
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_session_free(session: *mut dpb_session) {
    guarded("dpb_session_free", (), || {
        if session.is_null() {
            return;
        }
        unsafe {
            drop(Box::from_raw(session));
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_session_connect(session: *mut dpb_session) -> i32 {
    guarded("dpb_session_connect", 0, || {
        let Some(handle) = borrow_session(session) else {
            return 0;
        };
        lock_runtime().last_connect_error = None;
        match handle.session.connect() {
            Ok(()) => 1,
            Err(err) => {
                set_connect_error(Severity::Failed, to_code(err.kind()), err.to_string());
                0
            }
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_session_disconnect(session: *mut dpb_session) -> i32 {
    guarded("dpb_session_disconnect", -1, || {
        let Some(handle) = borrow_session(session) else {
            return -1;
        };
        handle.session.disconnect();
        0
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_session_is_connected(session: *mut dpb_session) -> i32 {
    guarded("dpb_session_is_connected", 0, || {
        match borrow_session(session) {
            Some(handle) if handle.session.is_connected() => 1,
            _ => 0,
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_set_protocol(
    session: *mut dpb_session,
    key: *const c_char,
    value: *const c_char,
) {
    guarded("dpb_set_protocol", (), || {
        if let Some(handle) = borrow_session(session) {
            handle.session.set_protocol(&cstr_arg(key), &cstr_arg(value));
        }
    })
}

// Command execution ------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn dpb_run_command(
    session: *mut dpb_session,
    cmd: *const c_char,
    cmd_id: c_int,
    tagged: c_int,
    args: *const *const c_char,
    argc: c_int,
) -> i32 {
    guarded("dpb_run_command", 0, || {
        let Some(handle) = borrow_session(session) else {
            return 0;
        };
        let name = cstr_arg(cmd);
        let mut arg_vec = Vec::new();
        if !args.is_null() && argc > 0 {
            let slice = unsafe { std::slice::from_raw_parts(args, argc as usize) };
            for item in slice {
                arg_vec.push(cstr_arg(*item));
            }
        }
        match handle
            .session
            .run_command(&name, cmd_id, tagged != 0, &arg_vec)
        {
            Ok(true) => 1,
            Ok(false) => 0,
            Err(err) => {
                // Connection-level failure; the slot holds the detail.
                set_connect_error(Severity::Failed, to_code(err.kind()), err.to_string());
                0
            }
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_cancel_command(session: *mut dpb_session, cmd_id: c_int) {
    guarded("dpb_cancel_command", (), || {
        if let Some(handle) = borrow_session(session) {
            handle.session.cancel_command(cmd_id);
        }
    })
}

// Connection-error slot --------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn dpb_connection_error() -> *mut dpb_message {
    guarded("dpb_connection_error", ptr::null_mut(), || {
        match lock_runtime().last_connect_error.as_ref() {
            Some((severity, code, text)) => chain_node(*severity, *code, text, ptr::null_mut()),
            None => ptr::null_mut(),
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_clear_connection_error() {
    guarded("dpb_clear_connection_error", (), || {
        lock_runtime().last_connect_error = None;
    })
}

// Connection attributes --------------------------------------------------------

macro_rules! session_string_getter {
    ($fn_name:ident, $method:ident) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $fn_name(session: *mut dpb_session) -> *mut c_char {
            guarded(stringify!($fn_name), ptr::null_mut(), || {
                match borrow_session(session) {
                    Some(handle) => alloc_string(handle.session.$method()),
                    None => ptr::null_mut(),
                }
            })
        }
    };
}

macro_rules! session_string_setter {
    ($fn_name:ident, $method:ident) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $fn_name(session: *mut dpb_session, value: *const c_char) {
            guarded(stringify!($fn_name), (), || {
                if let Some(handle) = borrow_session(session) {
                    handle.session.$method(cstr_arg(value));
                }
            })
        }
    };
}

session_string_getter!(dpb_session_endpoint, endpoint);
session_string_getter!(dpb_session_user, user);
session_string_getter!(dpb_session_credential, credential);
session_string_getter!(dpb_session_workspace, workspace);
session_string_getter!(dpb_session_cwd, cwd);
session_string_getter!(dpb_session_program_name, program_name);
session_string_getter!(dpb_session_program_version, program_version);
session_string_getter!(dpb_session_charset, charset);
session_string_getter!(dpb_session_file_charset, file_charset);

session_string_setter!(dpb_session_set_endpoint, set_endpoint);
session_string_setter!(dpb_session_set_user, set_user);
session_string_setter!(dpb_session_set_credential, set_credential);
session_string_setter!(dpb_session_set_workspace, set_workspace);
session_string_setter!(dpb_session_set_cwd, set_cwd);
session_string_setter!(dpb_session_set_program_name, set_program_name);
session_string_setter!(dpb_session_set_program_version, set_program_version);

#[unsafe(no_mangle)]
pub extern "C" fn dpb_session_set_character_set(
    session: *mut dpb_session,
    charset: *const c_char,
    file_charset: *const c_char,
) -> i32 {
    guarded("dpb_session_set_character_set", -1, || {
        let Some(handle) = borrow_session(session) else {
            return -1;
        };
        match handle
            .session
            .set_character_set(&cstr_arg(charset), &cstr_arg(file_charset))
        {
            Ok(()) => 0,
            Err(_) => -1,
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_session_api_level(session: *mut dpb_session) -> c_int {
    guarded("dpb_session_api_level", 0, || {
        borrow_session(session)
            .map(|handle| handle.session.api_level())
            .unwrap_or(0)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_session_is_unicode(session: *mut dpb_session) -> c_int {
    guarded("dpb_session_is_unicode", 0, || {
        match borrow_session(session) {
            Some(handle) if handle.session.is_unicode() => 1,
            _ => 0,
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_session_requires_login(session: *mut dpb_session) -> c_int {
    guarded("dpb_session_requires_login", 0, || {
        match borrow_session(session) {
            Some(handle) if handle.session.requires_login() => 1,
            _ => 0,
        }
    })
}

// Tagged output ----------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn dpb_tagged_count(session: *mut dpb_session, cmd_id: c_int) -> i32 {
    guarded("dpb_tagged_count", -1, || {
        let Some(handle) = borrow_session(session) else {
            return -1;
        };
        match handle.session.find_context(cmd_id) {
            Some(ctx) => ctx.tagged_count() as i32,
            None => -1,
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_tagged_output(
    session: *mut dpb_session,
    cmd_id: c_int,
    out_iter: *mut *mut dpb_tagged_iter,
) -> i32 {
    guarded("dpb_tagged_output", -1, || {
        if out_iter.is_null() {
            return -1;
        }
        unsafe {
            *out_iter = ptr::null_mut();
        }
        let Some(handle) = borrow_session(session) else {
            return -1;
        };
        let Some(ctx) = handle.session.find_context(cmd_id) else {
            return 0;
        };
        let iter = Box::new(dpb_tagged_iter {
            cursor: ctx.tagged_output(),
            current_len: -1,
        });
        unsafe {
            *out_iter = Box::into_raw(iter);
        }
        0
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_tagged_next_record(iter: *mut dpb_tagged_iter) -> i32 {
    guarded("dpb_tagged_next_record", 0, || {
        let Some(handle) = borrow_iter(iter) else {
            return 0;
        };
        match handle.cursor.next_record() {
            Some(record) => {
                handle.current_len = record.len() as i32;
                1
            }
            None => {
                handle.current_len = -1;
                0
            }
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_tagged_record_len(iter: *mut dpb_tagged_iter) -> i32 {
    guarded("dpb_tagged_record_len", -1, || {
        borrow_iter(iter).map(|handle| handle.current_len).unwrap_or(-1)
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_tagged_next_entry(
    iter: *mut dpb_tagged_iter,
    out_key: *mut *mut c_char,
    out_value: *mut *mut c_char,
) -> i32 {
    guarded("dpb_tagged_next_entry", 0, || {
        if out_key.is_null() || out_value.is_null() {
            return 0;
        }
        unsafe {
            *out_key = ptr::null_mut();
            *out_value = ptr::null_mut();
        }
        let Some(handle) = borrow_iter(iter) else {
            return 0;
        };
        match handle.cursor.next_entry() {
            Some((key, value)) => {
                let key = c_string(key).into_raw();
                let value = c_string(value).into_raw();
                unsafe {
                    *out_key = key;
                    *out_value = value;
                }
                1
            }
            None => 0,
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_iter_free(iter: *mut dpb_tagged_iter) {
    guarded("dpb_iter_free", (), || {
        if iter.is_null() {
            return;
        }
        unsafe {
            drop(Box::from_raw(iter));
        }
    })
}

// Message chains ---------------------------------------------------------------

fn chain_node(severity: i32, code: i32, text: &str, next: *mut dpb_message) -> *mut dpb_message {
    Box::into_raw(Box::new(dpb_message {
        severity,
        code,
        text: c_string(text).into_raw(),
        next,
    }))
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_error_results(session: *mut dpb_session, cmd_id: c_int) -> *mut dpb_message {
    guarded("dpb_error_results", ptr::null_mut(), || {
        let Some(handle) = borrow_session(session) else {
            return ptr::null_mut();
        };
        let Some(ctx) = handle.session.find_context(cmd_id) else {
            return ptr::null_mut();
        };
        let mut head = ptr::null_mut();
        for entry in ctx.error_results().iter().rev() {
            head = chain_node(entry.severity.code(), entry.code, &entry.text, head);
        }
        head
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_info_results(session: *mut dpb_session, cmd_id: c_int) -> *mut dpb_message {
    guarded("dpb_info_results", ptr::null_mut(), || {
        let Some(handle) = borrow_session(session) else {
            return ptr::null_mut();
        };
        let Some(ctx) = handle.session.find_context(cmd_id) else {
            return ptr::null_mut();
        };
        let mut head = ptr::null_mut();
        for entry in ctx.info_results().iter().rev() {
            head = chain_node(entry.level as i32, entry.code, &entry.text, head);
        }
        head
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_message_severity(msg: *const dpb_message) -> c_int {
    guarded("dpb_message_severity", -1, || {
        if msg.is_null() {
            return -1;
        }
        unsafe { (*msg).severity }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_message_code(msg: *const dpb_message) -> c_int {
    guarded("dpb_message_code", -1, || {
        if msg.is_null() {
            return -1;
        }
        unsafe { (*msg).code }
    })
}

/// Borrowed pointer, valid until the chain is freed.
#[unsafe(no_mangle)]
pub extern "C" fn dpb_message_text(msg: *const dpb_message) -> *const c_char {
    guarded("dpb_message_text", ptr::null(), || {
        if msg.is_null() {
            return ptr::null();
        }
        unsafe { (*msg).text as *const c_char }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_message_next(msg: *const dpb_message) -> *mut dpb_message {
    guarded("dpb_message_next", ptr::null_mut(), || {
        if msg.is_null() {
            return ptr::null_mut();
        }
        unsafe { (*msg).next }
    })
}

/// Free a whole chain from its head. Safe on null.
#[unsafe(no_mangle)]
pub extern "C" fn dpb_message_free(msg: *mut dpb_message) {
    guarded("dpb_message_free", (), || {
        let mut current = msg;
        while !current.is_null() {
            unsafe {
                let node = Box::from_raw(current);
                if !node.text.is_null() {
                    drop(CString::from_raw(node.text));
                }
                current = node.next;
            }
        }
    })
}

// Text, binary, and data-set channels -------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn dpb_text_results(
    session: *mut dpb_session,
    cmd_id: c_int,
    out: *mut dpb_buf,
) -> i32 {
    guarded("dpb_text_results", -1, || {
        let Some(handle) = borrow_session(session) else {
            return -1;
        };
        let Some(ctx) = handle.session.find_context(cmd_id) else {
            write_buf(out, &[]);
            return 0;
        };
        write_buf(out, ctx.text_results());
        0
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_binary_results(
    session: *mut dpb_session,
    cmd_id: c_int,
    out: *mut dpb_buf,
) -> i32 {
    guarded("dpb_binary_results", -1, || {
        let Some(handle) = borrow_session(session) else {
            return -1;
        };
        let Some(ctx) = handle.session.find_context(cmd_id) else {
            write_buf(out, &[]);
            return 0;
        };
        write_buf(out, ctx.binary_results());
        0
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_binary_count(session: *mut dpb_session, cmd_id: c_int) -> i64 {
    guarded("dpb_binary_count", -1, || {
        let Some(handle) = borrow_session(session) else {
            return -1;
        };
        match handle.session.find_context(cmd_id) {
            Some(ctx) => ctx.binary_count() as i64,
            None => -1,
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_data_set_set(
    session: *mut dpb_session,
    cmd_id: c_int,
    data: *const c_char,
) -> i32 {
    guarded("dpb_data_set_set", -1, || {
        let Some(handle) = borrow_session(session) else {
            return -1;
        };
        handle.session.set_data_set(cmd_id, cstr_arg(data));
        0
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_data_set(session: *mut dpb_session, cmd_id: c_int, out: *mut dpb_buf) -> i32 {
    guarded("dpb_data_set", -1, || {
        let Some(handle) = borrow_session(session) else {
            return -1;
        };
        let Some(ctx) = handle.session.find_context(cmd_id) else {
            write_buf(out, &[]);
            return 0;
        };
        write_buf(out, ctx.data_set());
        0
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_buf_free(buf: *mut dpb_buf) {
    guarded("dpb_buf_free", (), || {
        if buf.is_null() {
            return;
        }
        unsafe {
            let buf = &mut *buf;
            if !buf.data.is_null() && buf.len != 0 {
                drop(Vec::from_raw_parts(buf.data, buf.len, buf.len));
            }
            buf.data = ptr::null_mut();
            buf.len = 0;
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_string_free(input: *mut c_char) {
    guarded("dpb_string_free", (), || {
        if input.is_null() {
            return;
        }
        unsafe {
            drop(CString::from_raw(input));
        }
    })
}

// Environment calls ------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn dpb_env_get(key: *const c_char) -> *mut c_char {
    guarded("dpb_env_get", ptr::null_mut(), || {
        let key = cstr_arg(key);
        if key.is_empty() {
            return ptr::null_mut();
        }
        match lock_runtime().env.get(&key) {
            Some(value) => alloc_string(&value),
            None => ptr::null_mut(),
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_env_set(key: *const c_char, value: *const c_char) -> i32 {
    guarded("dpb_env_set", -1, || {
        let key = cstr_arg(key);
        if key.is_empty() {
            return -1;
        }
        match lock_runtime().env.set(&key, &cstr_arg(value)) {
            Ok(()) => 0,
            Err(err) => {
                tracing::warn!(%err, "env set failed");
                -1
            }
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_env_update(key: *const c_char, value: *const c_char) {
    guarded("dpb_env_update", (), || {
        let key = cstr_arg(key);
        if !key.is_empty() {
            lock_runtime().env.update(&key, &cstr_arg(value));
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_env_reload() {
    guarded("dpb_env_reload", (), || {
        lock_runtime().env.reload();
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_is_ignored(path: *const c_char) -> i32 {
    guarded("dpb_is_ignored", 0, || {
        let Some(path) = opt_cstr_arg(path) else {
            return 0;
        };
        let path = PathBuf::from(path);
        if is_ignored(&lock_runtime().env, &path) {
            1
        } else {
            0
        }
    })
}

// Trace control ----------------------------------------------------------------

#[unsafe(no_mangle)]
pub extern "C" fn dpb_set_trace_filter(filter: *const c_char, file: *const c_char) -> i32 {
    guarded("dpb_set_trace_filter", -1, || {
        let filter = cstr_arg(filter);
        let file = opt_cstr_arg(file).map(PathBuf::from);
        match init_trace(&filter, file.as_deref()) {
            Ok(()) => 0,
            Err(_) => -1,
        }
    })
}

// Callback registration ----------------------------------------------------------
//
// Passing null for any callback disables that channel; accumulated results stay
// reachable through the pull accessors either way.

#[unsafe(no_mangle)]
pub extern "C" fn dpb_set_log_handler(session: *mut dpb_session, handler: Option<dpb_log_fn>) {
    guarded("dpb_set_log_handler", (), || {
        if let Some(handle) = borrow_session(session) {
            handle.session.handlers_mut().log = handler.map(|f| {
                Box::new(move |level: i32, file: &str, line: u32, msg: &str| {
                    let file = c_string(file);
                    let msg = c_string(msg);
                    f(level, file.as_ptr(), line as c_int, msg.as_ptr());
                }) as _
            });
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_set_tagged_handler(session: *mut dpb_session, handler: Option<dpb_tagged_fn>) {
    guarded("dpb_set_tagged_handler", (), || {
        if let Some(handle) = borrow_session(session) {
            handle.session.handlers_mut().tagged = handler.map(|f| {
                Box::new(move |cmd_id: i32, key: &str, value: &str| {
                    let key = c_string(key);
                    let value = c_string(value);
                    f(cmd_id, key.as_ptr(), value.as_ptr());
                }) as _
            });
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_set_error_handler(session: *mut dpb_session, handler: Option<dpb_error_fn>) {
    guarded("dpb_set_error_handler", (), || {
        if let Some(handle) = borrow_session(session) {
            handle.session.handlers_mut().error = handler.map(|f| {
                Box::new(move |cmd_id: i32, severity: i32, code: i32, msg: &str| {
                    let msg = c_string(msg);
                    f(cmd_id, severity, code, msg.as_ptr());
                }) as _
            });
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_set_info_handler(session: *mut dpb_session, handler: Option<dpb_info_fn>) {
    guarded("dpb_set_info_handler", (), || {
        if let Some(handle) = borrow_session(session) {
            handle.session.handlers_mut().info = handler.map(|f| {
                Box::new(move |cmd_id: i32, level: u8, code: i32, msg: &str| {
                    let msg = c_string(msg);
                    f(cmd_id, level as c_int, code, msg.as_ptr());
                }) as _
            });
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_set_text_handler(session: *mut dpb_session, handler: Option<dpb_text_fn>) {
    guarded("dpb_set_text_handler", (), || {
        if let Some(handle) = borrow_session(session) {
            handle.session.handlers_mut().text = handler.map(|f| {
                Box::new(move |cmd_id: i32, data: &[u8]| {
                    f(cmd_id, data.as_ptr(), data.len());
                }) as _
            });
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_set_binary_handler(session: *mut dpb_session, handler: Option<dpb_binary_fn>) {
    guarded("dpb_set_binary_handler", (), || {
        if let Some(handle) = borrow_session(session) {
            handle.session.handlers_mut().binary = handler.map(|f| {
                Box::new(move |cmd_id: i32, data: &[u8]| {
                    f(cmd_id, data.as_ptr(), data.len());
                }) as _
            });
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_set_prompt_handler(session: *mut dpb_session, handler: Option<dpb_prompt_fn>) {
    guarded("dpb_set_prompt_handler", (), || {
        if let Some(handle) = borrow_session(session) {
            handle.session.handlers_mut().prompt = handler.map(|f| {
                Box::new(move |cmd_id: i32, msg: &str, echo: bool| {
                    let msg = c_string(msg);
                    let mut buf = vec![0u8; 1024];
                    let rc = f(
                        cmd_id,
                        msg.as_ptr(),
                        echo as c_int,
                        buf.as_mut_ptr() as *mut c_char,
                        buf.len(),
                    );
                    if rc < 0 {
                        return String::new();
                    }
                    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
                    String::from_utf8_lossy(&buf[..end]).into_owned()
                }) as _
            });
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_set_transfer_handler(
    session: *mut dpb_session,
    handler: Option<dpb_transfer_fn>,
) {
    guarded("dpb_set_transfer_handler", (), || {
        if let Some(handle) = borrow_session(session) {
            handle.session.handlers_mut().transfer = handler.map(|f| {
                Box::new(move |cmd_id: i32, done: u64, total: u64| {
                    f(cmd_id, done, total);
                }) as _
            });
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_set_resolve_handler(
    session: *mut dpb_session,
    handler: Option<dpb_resolve_fn>,
) {
    guarded("dpb_set_resolve_handler", (), || {
        if let Some(handle) = borrow_session(session) {
            handle.session.handlers_mut().resolve = handler.map(|f| {
                Box::new(move |cmd_id: i32, merge: &MergeData| {
                    let handle = dpb_merge {
                        data: merge as *const MergeData,
                    };
                    MergeStatus::from_code(f(cmd_id, &handle))
                }) as _
            });
        }
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn dpb_set_action_resolve_handler(
    session: *mut dpb_session,
    handler: Option<dpb_action_resolve_fn>,
) {
    guarded("dpb_set_action_resolve_handler", (), || {
        if let Some(handle) = borrow_session(session) {
            handle.session.handlers_mut().resolve_action = handler.map(|f| {
                Box::new(move |cmd_id: i32, resolve: &ResolveData| {
                    let handle = dpb_resolve {
                        data: resolve as *const ResolveData,
                    };
                    MergeStatus::from_code(f(cmd_id, &handle))
                }) as _
            });
        }
    })
}

// Merge accessors ----------------------------------------------------------------

fn borrow_merge<'a>(merge: *const dpb_merge) -> Option<&'a MergeData> {
    if merge.is_null() {
        return None;
    }
    let data = unsafe { (*merge).data };
    if data.is_null() {
        return None;
    }
    Some(unsafe { &*data })
}

macro_rules! merge_string_getter {
    ($fn_name:ident, $field:ident) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $fn_name(merge: *const dpb_merge) -> *mut c_char {
            guarded(stringify!($fn_name), ptr::null_mut(), || {
                match borrow_merge(merge) {
                    Some(data) => alloc_string(&data.$field),
                    None => ptr::null_mut(),
                }
            })
        }
    };
}

macro_rules! merge_count_getter {
    ($fn_name:ident, $field:ident) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $fn_name(merge: *const dpb_merge) -> c_int {
            guarded(stringify!($fn_name), -1, || {
                match borrow_merge(merge) {
                    Some(data) => data.$field as c_int,
                    None => -1,
                }
            })
        }
    };
}

merge_string_getter!(dpb_merge_base_file, base_file);
merge_string_getter!(dpb_merge_your_file, your_file);
merge_string_getter!(dpb_merge_their_file, their_file);
merge_string_getter!(dpb_merge_result_file, result_file);
merge_count_getter!(dpb_merge_your_chunks, your_chunks);
merge_count_getter!(dpb_merge_their_chunks, their_chunks);
merge_count_getter!(dpb_merge_both_chunks, both_chunks);
merge_count_getter!(dpb_merge_conflict_chunks, conflict_chunks);

// Digests are engine-computed and absent for binary or action resolves;
// absent reads as null, like any empty string on this surface.
macro_rules! merge_digest_getter {
    ($fn_name:ident, $field:ident) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $fn_name(merge: *const dpb_merge) -> *mut c_char {
            guarded(stringify!($fn_name), ptr::null_mut(), || {
                match borrow_merge(merge) {
                    Some(data) => alloc_string(data.$field.as_deref().unwrap_or("")),
                    None => ptr::null_mut(),
                }
            })
        }
    };
}

merge_digest_getter!(dpb_merge_merge_digest, merge_digest);
merge_digest_getter!(dpb_merge_your_digest, your_digest);
merge_digest_getter!(dpb_merge_their_digest, their_digest);

// Action-resolve accessors -------------------------------------------------------

fn borrow_resolve<'a>(resolve: *const dpb_resolve) -> Option<&'a ResolveData> {
    if resolve.is_null() {
        return None;
    }
    let data = unsafe { (*resolve).data };
    if data.is_null() {
        return None;
    }
    Some(unsafe { &*data })
}

macro_rules! resolve_string_getter {
    ($fn_name:ident, $field:ident) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn $fn_name(resolve: *const dpb_resolve) -> *mut c_char {
            guarded(stringify!($fn_name), ptr::null_mut(), || {
                match borrow_resolve(resolve) {
                    Some(data) => alloc_string(&data.$field),
                    None => ptr::null_mut(),
                }
            })
        }
    };
}

resolve_string_getter!(dpb_resolve_type, resolve_type);
resolve_string_getter!(dpb_resolve_merge_action, merge_action);
resolve_string_getter!(dpb_resolve_yours_action, yours_action);
resolve_string_getter!(dpb_resolve_their_action, their_action);
resolve_string_getter!(dpb_resolve_prompt, prompt);

#[unsafe(no_mangle)]
pub extern "C" fn dpb_merge_auto_resolve(merge: *const dpb_merge, force: c_int) -> c_int {
    guarded("dpb_merge_auto_resolve", MergeStatus::Quit.code(), || {
        match borrow_merge(merge) {
            Some(data) => data.auto_resolve(MergeForce::from_code(force)).code(),
            None => MergeStatus::Quit.code(),
        }
    })
}
