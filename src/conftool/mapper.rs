use crate::conftool::{LookupError, Paper, Result, User};
use crate::xml::{NodeId, XmlTree};

fn child_text(tree: &XmlTree, parent: NodeId, name: &str) -> Option<String> {
    tree.first_child_named(parent, name)
        .map(|id| tree.text_content(id).trim().to_string())
        .filter(|s| !s.is_empty())
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(';')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Pairs author i with organisation i: `"Name (Organisation)"`, or `"Name"` alone.
fn authors_and_affiliations(authors: Vec<String>, organisations: Vec<String>) -> Vec<String> {
    authors
        .into_iter()
        .enumerate()
        .map(|(i, name)| match organisations.get(i) {
            Some(org) => format!("{name} ({org})"),
            None => name,
        })
        .collect()
}

/// Papers from a `papers` export: `<paper>` children of the root element.
pub fn paper_list(tree: &XmlTree) -> Result<Vec<Paper>> {
    let mut papers = Vec::new();
    for paper in tree.children_named(tree.root(), "paper") {
        let raw_id = child_text(tree, paper, "paperID")
            .ok_or_else(|| LookupError::Response("paper without paperID".to_string()))?;
        let paper_id = raw_id
            .parse::<i64>()
            .map_err(|e| LookupError::Response(format!("paperID {raw_id:?}: {e}")))?;
        let title = child_text(tree, paper, "title").unwrap_or_default();
        let authors = split_list(child_text(tree, paper, "authors"));
        let organisations = split_list(child_text(tree, paper, "organisations"));
        papers.push(Paper {
            paper_id,
            title,
            authors_and_affiliations: authors_and_affiliations(authors, organisations),
        });
    }
    Ok(papers)
}

/// First `<user>` of a `users` export as (first name, last name).
pub fn user_details(tree: &XmlTree) -> Option<(Option<String>, Option<String>)> {
    let user = tree.first_child_named(tree.root(), "user")?;
    Some((
        child_text(tree, user, "firstname"),
        child_text(tree, user, "name"),
    ))
}

pub(crate) fn login_succeeded(tree: &XmlTree) -> bool {
    login_field(tree, "result")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub(crate) fn login_field(tree: &XmlTree, name: &str) -> Option<String> {
    tree.elements_at_path(&["login", name])
        .first()
        .map(|id| tree.text_content(*id).trim().to_string())
}

pub(crate) fn login_user(tree: &XmlTree) -> Result<User> {
    let raw_id = login_field(tree, "id")
        .ok_or_else(|| LookupError::Response("login reply without id".to_string()))?;
    let user_id = raw_id
        .parse::<i64>()
        .map_err(|e| LookupError::Response(format!("login id {raw_id:?}: {e}")))?;
    let username = login_field(tree, "username")
        .ok_or_else(|| LookupError::Response("login reply without username".to_string()))?;
    Ok(User::new(user_id, username))
}
