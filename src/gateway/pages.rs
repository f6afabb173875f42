//! Server-rendered pages for the auth flow.
//!
//! Plain `format!`-built HTML with a shared stylesheet — no template engine.
//! Anything echoed back from user input goes through [`escape`].

use super::RegisterErrors;

pub fn base_style() -> &'static str {
    r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        background: #f5f5f5; color: #333;
        display: flex; justify-content: center; align-items: center;
        min-height: 100vh; padding: 20px;
    }
    .card {
        background: #fff; border-radius: 16px; padding: 32px;
        max-width: 400px; width: 100%; box-shadow: 0 4px 24px rgba(0,0,0,0.08);
    }
    .logo { text-align: center; margin-bottom: 24px; }
    .logo h1 { font-size: 28px; color: #1a1a2e; }
    .logo p { font-size: 14px; color: #666; margin-top: 4px; }
    .form-group { margin-bottom: 16px; }
    .form-group label { display: block; font-size: 14px; font-weight: 500; margin-bottom: 6px; color: #444; }
    .form-group input {
        width: 100%; padding: 12px 14px; border: 1.5px solid #ddd;
        border-radius: 10px; font-size: 16px; outline: none; transition: border-color 0.2s;
    }
    .form-group input:focus { border-color: #4a6cf7; }
    .field-error { font-size: 13px; color: #d32f2f; margin-top: 4px; }
    .btn {
        width: 100%; padding: 14px; border: none; border-radius: 10px;
        font-size: 16px; font-weight: 600; cursor: pointer; transition: background 0.2s;
    }
    .btn-primary { background: #4a6cf7; color: #fff; }
    .btn-primary:hover { background: #3b5de7; }
    .error { background: #fff0f0; color: #d32f2f; padding: 10px 14px; border-radius: 8px; font-size: 13px; margin-bottom: 16px; }
    .notice { background: #f0fff4; color: #2e7d32; padding: 10px 14px; border-radius: 8px; font-size: 13px; margin-bottom: 16px; }
    .link { text-align: center; margin-top: 16px; font-size: 14px; color: #666; }
    .link a { color: #4a6cf7; text-decoration: none; }
    .link a:hover { text-decoration: underline; }
    "#
}

/// Escape a string for safe interpolation into HTML text or attributes.
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn banner(class: &str, message: Option<&str>) -> String {
    message
        .map(|m| format!(r#"<div class="{class}">{}</div>"#, escape(m)))
        .unwrap_or_default()
}

fn field_error(message: Option<&str>) -> String {
    message
        .map(|m| format!(r#"<div class="field-error">{}</div>"#, escape(m)))
        .unwrap_or_default()
}

pub fn render_welcome() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>Gatelock</title>
<style>{style}</style>
</head><body>
<div class="card">
  <div class="logo"><h1>Gatelock</h1><p>Account authentication demo</p></div>
  <div class="link">
    <a href="/login">Login</a> &middot; <a href="/register">Register</a>
  </div>
</div>
</body></html>"#,
        style = base_style(),
    )
}

pub fn render_register_page(name: &str, email: &str, errors: &RegisterErrors) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>Gatelock - Register</title>
<style>{style}</style>
</head><body>
<div class="card">
  <div class="logo"><h1>Gatelock</h1><p>Create an account</p></div>
  <form method="POST" action="/register">
    <div class="form-group">
      <label>Name</label>
      <input type="text" name="name" value="{name}" autocomplete="name" placeholder="Your name">
      {name_error}
    </div>
    <div class="form-group">
      <label>Email</label>
      <input type="email" name="email" value="{email}" autocomplete="email" placeholder="you@example.com">
      {email_error}
    </div>
    <div class="form-group">
      <label>Password</label>
      <input type="password" name="password" autocomplete="new-password" placeholder="Min 6 characters">
      {password_error}
    </div>
    <button type="submit" class="btn btn-primary">Register</button>
  </form>
  <div class="link">
    Already have an account?<br>
    <a href="/login">Login</a>
  </div>
</div>
</body></html>"#,
        style = base_style(),
        name = escape(name),
        email = escape(email),
        name_error = field_error(errors.name),
        email_error = field_error(errors.email),
        password_error = field_error(errors.password),
    )
}

pub fn render_login_page(error: Option<&str>, notice: Option<&str>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>Gatelock - Login</title>
<style>{style}</style>
</head><body>
<div class="card">
  <div class="logo"><h1>Gatelock</h1><p>Login</p></div>
  {notice_html}
  {error_html}
  <form method="POST" action="/login">
    <div class="form-group">
      <label>Email</label>
      <input type="email" name="email" required autocomplete="email" placeholder="you@example.com">
    </div>
    <div class="form-group">
      <label>Password</label>
      <input type="password" name="password" required autocomplete="current-password" placeholder="Enter password">
    </div>
    <button type="submit" class="btn btn-primary">Login</button>
  </form>
  <div class="link">
    No account yet?<br>
    <a href="/register">Register</a>
  </div>
</div>
</body></html>"#,
        style = base_style(),
        notice_html = banner("notice", notice),
        error_html = banner("error", error),
    )
}

pub fn render_dashboard(name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>Gatelock - Dashboard</title>
<style>{style}</style>
</head><body>
<div class="card">
  <div class="logo"><h1>Dashboard</h1><p>Welcome, {name}!</p></div>
  <p style="text-align:center;font-size:14px;color:#666;">You are logged in.</p>
  <div class="link"><a href="/logout">Logout</a></div>
</div>
</body></html>"#,
        style = base_style(),
        name = escape(name),
    )
}

pub fn render_server_error() -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en"><head>
<meta charset="utf-8"><meta name="viewport" content="width=device-width,initial-scale=1">
<title>Gatelock - Error</title>
<style>{style}</style>
</head><body>
<div class="card">
  <div class="logo"><h1>Something went wrong</h1><p>Please try again later.</p></div>
  <div class="link"><a href="/">Back</a></div>
</div>
</body></html>"#,
        style = base_style(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_neutralizes_markup() {
        assert_eq!(
            escape(r#"<script>alert("x&y")</script>"#),
            "&lt;script&gt;alert(&quot;x&amp;y&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape("it's"), "it&#39;s");
    }

    #[test]
    fn register_page_echoes_escaped_input() {
        let errors = RegisterErrors::default();
        let html = render_register_page("<b>Eve</b>", "eve@example.com", &errors);
        assert!(html.contains("&lt;b&gt;Eve&lt;/b&gt;"));
        assert!(!html.contains("<b>Eve</b>"));
        assert!(html.contains("eve@example.com"));
    }

    #[test]
    fn register_page_shows_field_errors() {
        let errors = RegisterErrors {
            name: Some("Name is required."),
            email: None,
            password: Some("Password must be at least 6 characters."),
        };
        let html = render_register_page("", "", &errors);
        assert!(html.contains("Name is required."));
        assert!(html.contains("at least 6 characters"));
    }

    #[test]
    fn login_page_renders_error_and_notice() {
        let html = render_login_page(Some("Wrong Password"), None);
        assert!(html.contains(r#"<div class="error">Wrong Password</div>"#));

        let html = render_login_page(None, Some("Account Created Successfully"));
        assert!(html.contains(r#"<div class="notice">Account Created Successfully</div>"#));

        let html = render_login_page(None, None);
        assert!(!html.contains(r#"class="error""#));
    }

    #[test]
    fn dashboard_greets_account_by_name() {
        let html = render_dashboard("Alice");
        assert!(html.contains("Welcome, Alice!"));
        assert!(html.contains(r#"href="/logout""#));
    }
}
