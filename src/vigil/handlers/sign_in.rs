use axum::{extract::RawQuery, response::Html};

use crate::vigil::{
    properties::{
        DEFAULT_LOGIN_PROCESSING_URL_FORM, DEFAULT_LOGIN_PROCESSING_URL_MOBILE,
        DEFAULT_PARAMETER_NAME_MOBILE,
    },
    security::{remember_me::REMEMBER_ME_PARAMETER, CodeType},
};

/// Minimal sign-in page served at the configured login page path.
pub async fn sign_in(RawQuery(query): RawQuery) -> Html<String> {
    Html(render(notice(query.as_deref())))
}

fn notice(query: Option<&str>) -> Option<&'static str> {
    let query = query?;
    let has = |flag: &str| {
        query
            .split('&')
            .any(|pair| pair.split('=').next() == Some(flag))
    };

    if has("error") {
        Some("Sign-in failed, please try again.")
    } else if has("logout") {
        Some("You have been signed out.")
    } else {
        None
    }
}

fn render(notice: Option<&str>) -> String {
    let notice = notice.map_or_else(String::new, |text| format!("<p class=\"notice\">{text}</p>"));
    let image = CodeType::Image.parameter_name();
    let sms = CodeType::Sms.parameter_name();

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Sign in</title></head>
<body>
<h2>Sign in</h2>
{notice}
<form action="{DEFAULT_LOGIN_PROCESSING_URL_FORM}" method="post">
  <label>Username <input type="text" name="username"></label><br>
  <label>Password <input type="password" name="password"></label><br>
  <label>Image code <input type="text" name="{image}"></label><br>
  <label><input type="checkbox" name="{REMEMBER_ME_PARAMETER}" value="true"> Remember me</label><br>
  <button type="submit">Sign in</button>
</form>
<h2>Sign in with SMS</h2>
<form action="{DEFAULT_LOGIN_PROCESSING_URL_MOBILE}" method="post">
  <label>Mobile <input type="text" name="{DEFAULT_PARAMETER_NAME_MOBILE}"></label><br>
  <label>SMS code <input type="text" name="{sms}"></label><br>
  <label><input type="checkbox" name="{REMEMBER_ME_PARAMETER}" value="true"> Remember me</label><br>
  <button type="submit">Sign in</button>
</form>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_posts_to_both_login_urls() {
        let page = render(None);
        assert!(page.contains(r#"action="/authentication/form""#));
        assert!(page.contains(r#"action="/authentication/mobile""#));
        assert!(page.contains(r#"name="imageCode""#));
        assert!(page.contains(r#"name="smsCode""#));
        assert!(page.contains(r#"name="mobile""#));
        assert!(page.contains(r#"name="remember-me""#));
        assert!(!page.contains("class=\"notice\""));
    }

    #[test]
    fn notice_follows_query_flags() {
        assert_eq!(notice(None), None);
        assert_eq!(notice(Some("foo=bar")), None);
        assert_eq!(notice(Some("error")), Some("Sign-in failed, please try again."));
        assert_eq!(notice(Some("logout")), Some("You have been signed out."));
        assert_eq!(notice(Some("x=1&error=")), Some("Sign-in failed, please try again."));
    }
}
