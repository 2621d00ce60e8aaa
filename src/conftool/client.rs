use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::debug;
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};

use crate::conftool::mapper::{login_field, login_succeeded, login_user, paper_list, user_details};
use crate::conftool::{LookupError, Paper, PaperLookup, Result, User};
use crate::xml::XmlTree;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportType {
    Papers,
    Users,
}

impl ExportType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Papers => "papers",
            Self::Users => "users",
        }
    }
}

/// REST client for ConfTool's remote login and admin export pages.
///
/// Every request is signed with a fresh nonce and `sha256(nonce + shared_pass)`.
pub struct ConfToolClient {
    url: String,
    shared_pass: String,
    http: Client,
}

impl ConfToolClient {
    pub fn new(url: impl Into<String>, shared_pass: impl Into<String>) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            url: url.into(),
            shared_pass: shared_pass.into(),
            http,
        })
    }

    fn nonce() -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        (millis * 60).to_string()
    }

    fn pass_hash(&self, nonce: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(nonce.as_bytes());
        hasher.update(self.shared_pass.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn get_xml(&self, page: &str, params: &[(&str, String)]) -> Result<XmlTree> {
        let nonce = Self::nonce();
        let mut query: Vec<(&str, String)> = vec![
            ("page", page.to_string()),
            ("nonce", nonce.clone()),
            ("passhash", self.pass_hash(&nonce)),
        ];
        query.extend(params.iter().cloned());

        debug!("conftool request page={page}");
        let body = self
            .http
            .get(&self.url)
            .query(&query)
            .send()?
            .error_for_status()?
            .bytes()?;
        XmlTree::parse(page, &body).map_err(|e| LookupError::Response(e.to_string()))
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let reply = self.get_xml(
            "remoteLogin",
            &[
                ("user", username.to_string()),
                ("command", "login".to_string()),
                ("password", password.to_string()),
            ],
        )?;
        if login_succeeded(&reply) {
            login_user(&reply)
        } else {
            Err(LookupError::Authentication(
                login_field(&reply, "message").unwrap_or_else(|| "login rejected".to_string()),
            ))
        }
    }

    /// Raw XML of the service's account details for `username`.
    pub fn details(&self, username: &str) -> Result<String> {
        let reply = self.get_xml(
            "remoteLogin",
            &[
                ("user", username.to_string()),
                ("command", "request".to_string()),
            ],
        )?;
        Ok(String::from_utf8_lossy(&reply.to_bytes()).into_owned())
    }

    pub fn export(&self, export: ExportType, user: Option<&User>) -> Result<XmlTree> {
        let mut params: Vec<(&str, String)> = vec![
            ("export_select", export.as_str().to_string()),
            ("form_include_deleted", "0".to_string()),
            ("form_export_format", "xml".to_string()),
            ("form_export_header", "default".to_string()),
            ("cmd_create_export", "true".to_string()),
        ];
        if let Some(user) = user {
            params.push(("form_userID", user.user_id.to_string()));
        }
        self.get_xml("adminExport", &params)
    }
}

impl PaperLookup for ConfToolClient {
    fn papers(&self, user: &User) -> Result<Vec<Paper>> {
        paper_list(&self.export(ExportType::Papers, Some(user))?)
    }

    fn detailed_user(&self, user: &User) -> Result<User> {
        let mut detailed = user.clone();
        if let Some((first, last)) = user_details(&self.export(ExportType::Users, Some(user))?) {
            detailed.first_name = first;
            detailed.last_name = last;
        }
        Ok(detailed)
    }
}

#[cfg(test)]
mod tests {
    use mockito::{Matcher, Server};

    use super::*;

    fn client(server: &Server) -> ConfToolClient {
        ConfToolClient::new(format!("{}/conftool/rest.php", server.url()), "secret").expect("client")
    }

    #[test]
    fn pass_hash_is_hex_sha256_of_nonce_and_secret() {
        let c = ConfToolClient::new("http://localhost/", "secret").expect("client");
        let expected = hex::encode(Sha256::digest(b"12345secret"));
        assert_eq!(c.pass_hash("12345"), expected);
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn authenticate_returns_user_on_success() {
        let mut server = Server::new();
        let m = server
            .mock("GET", "/conftool/rest.php")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "remoteLogin".into()),
                Matcher::UrlEncoded("command".into(), "login".into()),
                Matcher::UrlEncoded("user".into(), "asmith".into()),
                Matcher::UrlEncoded("password".into(), "p&ss word".into()),
                Matcher::Regex("passhash=[0-9a-f]{64}".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "text/xml")
            .with_body("<login><result>true</result><id>17</id><username>asmith</username></login>")
            .create();

        let user = client(&server).authenticate("asmith", "p&ss word").expect("login");
        assert_eq!(user, User::new(17, "asmith"));
        m.assert();
    }

    #[test]
    fn authenticate_reports_rejection_message() {
        let mut server = Server::new();
        let _m = server
            .mock("GET", "/conftool/rest.php")
            .match_query(Matcher::Any)
            .with_body("<login><result>false</result><message>bad credentials</message></login>")
            .create();

        let err = client(&server).authenticate("asmith", "nope").expect_err("must fail");
        assert!(matches!(err, LookupError::Authentication(ref m) if m == "bad credentials"));
    }

    #[test]
    fn paper_lookup_filters_the_user_export() {
        let mut server = Server::new();
        let m = server
            .mock("GET", "/conftool/rest.php")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "adminExport".into()),
                Matcher::UrlEncoded("export_select".into(), "papers".into()),
                Matcher::UrlEncoded("form_userID".into(), "17".into()),
                Matcher::UrlEncoded("form_export_format".into(), "xml".into()),
            ]))
            .with_body(
                "<papers><paper><paperID>42</paperID><title>Modeling Scale</title>\
                 <authors>A. Smith</authors><organisations>MIT</organisations></paper></papers>",
            )
            .expect(2)
            .create();

        let c = client(&server);
        let user = User::new(17, "asmith");
        let paper = c.paper(&user, 42).expect("paper");
        assert_eq!(paper.title, "Modeling Scale");
        assert_eq!(paper.authors_and_affiliations, ["A. Smith (MIT)"]);
        assert!(matches!(c.paper(&user, 99), Err(LookupError::PaperNotFound(99))));
        m.assert();
    }

    #[test]
    fn detailed_user_fills_names() {
        let mut server = Server::new();
        let _m = server
            .mock("GET", "/conftool/rest.php")
            .match_query(Matcher::UrlEncoded("export_select".into(), "users".into()))
            .with_body("<users><user><firstname>Anne</firstname><name>Smith</name></user></users>")
            .create();

        let user = client(&server)
            .detailed_user(&User::new(17, "asmith"))
            .expect("user");
        assert_eq!(user.first_name.as_deref(), Some("Anne"));
        assert_eq!(user.last_name.as_deref(), Some("Smith"));
        assert_eq!(user.username, "asmith");
    }

    #[test]
    fn http_errors_and_garbage_replies_surface() {
        let mut server = Server::new();
        let _m = server
            .mock("GET", "/conftool/rest.php")
            .match_query(Matcher::UrlEncoded("export_select".into(), "papers".into()))
            .with_status(500)
            .create();
        let _g = server
            .mock("GET", "/conftool/rest.php")
            .match_query(Matcher::UrlEncoded("export_select".into(), "users".into()))
            .with_body("<html><body>maintenance")
            .create();

        let c = client(&server);
        let user = User::new(17, "asmith");
        assert!(matches!(c.papers(&user), Err(LookupError::Io(_))));
        assert!(matches!(c.detailed_user(&user), Err(LookupError::Response(_))));
    }

    #[test]
    fn details_requests_without_password_and_returns_raw_xml() {
        let mut server = Server::new();
        let m = server
            .mock("GET", "/conftool/rest.php")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "remoteLogin".into()),
                Matcher::UrlEncoded("command".into(), "request".into()),
                Matcher::UrlEncoded("user".into(), "asmith".into()),
                Matcher::Regex("passhash=[0-9a-f]{64}".into()),
            ]))
            .with_body(r#"<login><result>true</result><id>17</id><email kind="work">a@b.org</email></login>"#)
            .create();
        let login = server
            .mock("GET", "/conftool/rest.php")
            .match_query(Matcher::Regex("password=".into()))
            .expect(0)
            .create();

        let xml = client(&server).details("asmith").expect("details");
        assert_eq!(
            xml,
            r#"<login><result>true</result><id>17</id><email kind="work">a@b.org</email></login>"#
        );
        m.assert();
        login.assert();
    }
}
