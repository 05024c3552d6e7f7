use std::collections::HashMap;

use crate::api::models::Contact;

/// Scan the contact list for problems and annotate duplicates.
///
/// Duplicate detection keys on the lower-cased email; contacts without an
/// email are never duplicates of each other. The returned issue strings are
/// advisory only and never block the workflow. Safe to re-run after every
/// edit or deletion.
pub fn validate(contacts: &mut [Contact]) -> Vec<String> {
    let mut issues = Vec::new();
    let mut email_counts: HashMap<String, usize> = HashMap::new();
    let mut missing_names = 0;
    let mut missing_phones = 0;
    let mut invalid_emails = 0;

    for contact in contacts.iter() {
        let email = contact.email.to_lowercase();
        if !email.is_empty() {
            *email_counts.entry(email.clone()).or_insert(0) += 1;
        }
        if contact.name.trim().is_empty() {
            missing_names += 1;
        }
        let phone = contact.phone.trim();
        if phone.is_empty() || phone == "-" {
            missing_phones += 1;
        }
        if email.is_empty() || !email.contains('@') {
            invalid_emails += 1;
        }
    }

    // One issue line per distinct duplicated address.
    let duplicates = email_counts.values().filter(|&&count| count > 1).count();
    if duplicates > 0 {
        issues.push(format!("{duplicates} duplicate email(s) found"));
    }
    if missing_names > 0 {
        issues.push(format!("{missing_names} contact(s) missing names"));
    }
    if missing_phones > 0 {
        issues.push(format!("{missing_phones} contact(s) missing phone numbers"));
    }
    if invalid_emails > 0 {
        issues.push(format!("{invalid_emails} contact(s) with invalid emails"));
    }

    for contact in contacts.iter_mut() {
        let email = contact.email.to_lowercase();
        contact.is_duplicate =
            !email.is_empty() && email_counts.get(&email).copied().unwrap_or(0) > 1;
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, email: &str, phone: &str) -> Contact {
        Contact {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn flags_case_insensitive_duplicates() {
        let mut contacts = vec![
            contact("A", "a@x.com", "555"),
            contact("B", "A@X.COM", "555"),
            contact("C", "b@x.com", "555"),
        ];
        let issues = validate(&mut contacts);
        assert!(contacts[0].is_duplicate);
        assert!(contacts[1].is_duplicate);
        assert!(!contacts[2].is_duplicate);
        let dup_issues: Vec<_> = issues.iter().filter(|i| i.contains("duplicate")).collect();
        assert_eq!(dup_issues, vec!["1 duplicate email(s) found"]);
    }

    #[test]
    fn empty_emails_are_not_duplicates_of_each_other() {
        let mut contacts = vec![contact("A", "", "555"), contact("B", "", "555")];
        validate(&mut contacts);
        assert!(!contacts[0].is_duplicate);
        assert!(!contacts[1].is_duplicate);
    }

    #[test]
    fn counts_missing_fields_and_invalid_emails() {
        let mut contacts = vec![
            contact("", "a@x.com", "-"),
            contact("  ", "not-an-email", "555"),
            contact("C", "", "  "),
        ];
        let issues = validate(&mut contacts);
        assert_eq!(
            issues,
            vec![
                "2 contact(s) missing names",
                "2 contact(s) missing phone numbers",
                "2 contact(s) with invalid emails",
            ]
        );
    }

    #[test]
    fn issue_order_is_fixed() {
        let mut contacts = vec![
            contact("", "dup@x.com", "-"),
            contact("B", "dup@x.com", "555"),
        ];
        let issues = validate(&mut contacts);
        assert_eq!(
            issues,
            vec![
                "1 duplicate email(s) found",
                "1 contact(s) missing names",
                "1 contact(s) missing phone numbers",
            ]
        );
    }

    #[test]
    fn rerun_clears_stale_duplicate_flags() {
        let mut contacts = vec![
            contact("A", "a@x.com", "555"),
            contact("B", "a@x.com", "555"),
        ];
        validate(&mut contacts);
        assert!(contacts[1].is_duplicate);
        contacts[1].email = "b@x.com".to_string();
        let issues = validate(&mut contacts);
        assert!(!contacts[0].is_duplicate);
        assert!(!contacts[1].is_duplicate);
        assert!(issues.is_empty());
    }
}
