use std::ffi::{c_char, CStr, CString};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use once_cell::sync::Lazy;

use crate::config::BridgeConfig;
use crate::conftool::{ConfToolClient, PaperLookup, User};
use crate::odf::template::load_template;
use crate::odf::OdtConverter;

static LAST_ERROR: Lazy<Mutex<Option<CString>>> = Lazy::new(|| Mutex::new(None));

fn set_last_error(msg: &str) {
    let c = CString::new(msg).unwrap_or_else(|_| CString::new("error").expect("cstr"));
    let mut guard = LAST_ERROR.lock().unwrap_or_else(|e| e.into_inner());
    *guard = Some(c);
}

fn take_cstr(ptr: *const c_char, name: &str) -> Result<String, String> {
    if ptr.is_null() {
        return Err(format!("{name} is null"));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map(|s| s.to_string())
        .map_err(|_| format!("{name} is not valid UTF-8"))
}

struct Session {
    converter: OdtConverter,
    client: ConfToolClient,
    user: User,
}

fn open_session(config_path: &str, username: &str, password: &str) -> anyhow::Result<Session> {
    let cfg = BridgeConfig::resolve(Some(PathBuf::from(config_path))).context("load config")?;
    let (url, shared_pass) = cfg.conftool_credentials()?;
    let client = ConfToolClient::new(url, shared_pass).context("create conftool client")?;
    let user = client.authenticate(username, password).context("authenticate")?;
    let template = load_template(cfg.template_path.as_deref()).context("load template")?;
    Ok(Session {
        converter: OdtConverter::with_template(template.into_owned()),
        client,
        user,
    })
}

fn write_output(output: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::write(output, bytes).with_context(|| format!("write output: {}", output.display()))
}

/// Writes the conference template personalized for `paper_id` to `output_odt`.
///
/// Returns 0 on success; non-zero on failure (see `dh_last_error_utf8()`).
#[no_mangle]
pub extern "C" fn dh_personalize_template(
    config_path: *const c_char,
    username: *const c_char,
    password: *const c_char,
    paper_id: i64,
    output_odt: *const c_char,
) -> i32 {
    let args = (|| {
        Ok::<_, String>((
            take_cstr(config_path, "config_path")?,
            take_cstr(username, "username")?,
            take_cstr(password, "password")?,
            take_cstr(output_odt, "output_odt")?,
        ))
    })();
    let (cfg, user, pass, output) = match args {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&e);
            return 2;
        }
    };

    let result = open_session(&cfg, &user, &pass).and_then(|s| {
        let paper = s.client.paper(&s.user, paper_id).context("look up paper")?;
        let bytes = s.converter.personalized_template(&paper)?;
        write_output(Path::new(&output), &bytes)
    });
    match result {
        Ok(()) => 0,
        Err(err) => {
            set_last_error(&format!("{err:#}"));
            10
        }
    }
}

/// Converts the submitted `input_odt` into `output_odt`.
///
/// Returns 0 on success; non-zero on failure (see `dh_last_error_utf8()`).
#[no_mangle]
pub extern "C" fn dh_convert_odt(
    config_path: *const c_char,
    username: *const c_char,
    password: *const c_char,
    input_odt: *const c_char,
    output_odt: *const c_char,
) -> i32 {
    let args = (|| {
        Ok::<_, String>((
            take_cstr(config_path, "config_path")?,
            take_cstr(username, "username")?,
            take_cstr(password, "password")?,
            take_cstr(input_odt, "input_odt")?,
            take_cstr(output_odt, "output_odt")?,
        ))
    })();
    let (cfg, user, pass, input, output) = match args {
        Ok(v) => v,
        Err(e) => {
            set_last_error(&e);
            return 2;
        }
    };

    let result = open_session(&cfg, &user, &pass).and_then(|s| {
        let source =
            std::fs::read(&input).with_context(|| format!("read input: {input}"))?;
        let bytes = s.converter.convert(&source, &s.user, &s.client)?;
        write_output(Path::new(&output), &bytes)
    });
    match result {
        Ok(()) => 0,
        Err(err) => {
            set_last_error(&format!("{err:#}"));
            11
        }
    }
}

/// Returns the last error message as a UTF-8 C string pointer (or null if none).
/// The pointer is valid until the next failing call.
#[no_mangle]
pub extern "C" fn dh_last_error_utf8() -> *const c_char {
    let guard = LAST_ERROR.lock().unwrap_or_else(|e| e.into_inner());
    match guard.as_ref() {
        Some(s) => s.as_ptr(),
        None => std::ptr::null(),
    }
}
