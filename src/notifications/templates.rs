use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::OutgoingEmail;

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn or_unspecified(s: &str) -> String {
    if s.is_empty() {
        "not specified".to_string()
    } else {
        escape(s)
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

pub fn welcome(to: &str, first_name: &str) -> OutgoingEmail {
    OutgoingEmail {
        kind: "welcome",
        to: to.to_string(),
        subject: "Welcome to the programming course!".into(),
        html_body: format!(
            "<h2>Hello {}!</h2>\
             <p>Thanks for joining the programming course.</p>\
             <p>Your account is ready. You can now access every course and resource.</p>\
             <p>The course team</p>",
            escape(first_name)
        ),
    }
}

pub struct RegistrationDetails<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub country: &'a str,
    pub experience: &'a str,
    pub newsletter: bool,
}

pub fn admin_registration(admin: &str, d: &RegistrationDetails<'_>) -> OutgoingEmail {
    OutgoingEmail {
        kind: "admin_registration",
        to: admin.to_string(),
        subject: "New user - programming course".into(),
        html_body: format!(
            "<h2>A new user joined</h2>\
             <p><strong>Name:</strong> {} {}</p>\
             <p><strong>Email:</strong> {}</p>\
             <p><strong>Phone:</strong> {}</p>\
             <p><strong>Country:</strong> {}</p>\
             <p><strong>Experience:</strong> {}</p>\
             <p><strong>Newsletter:</strong> {}</p>",
            escape(d.first_name),
            escape(d.last_name),
            escape(d.email),
            or_unspecified(d.phone),
            escape(d.country),
            escape(d.experience),
            yes_no(d.newsletter),
        ),
    }
}

pub fn admin_login(
    admin: &str,
    first_name: &str,
    last_name: &str,
    email: &str,
    at: OffsetDateTime,
) -> OutgoingEmail {
    let when = at.format(&Rfc3339).unwrap_or_else(|_| at.to_string());
    OutgoingEmail {
        kind: "admin_login",
        to: admin.to_string(),
        subject: "Login - programming course".into(),
        html_body: format!(
            "<h2>New login</h2>\
             <p><strong>User:</strong> {} {}</p>\
             <p><strong>Email:</strong> {}</p>\
             <p><strong>Time:</strong> {}</p>",
            escape(first_name),
            escape(last_name),
            escape(email),
            when,
        ),
    }
}

pub struct ContactDetails<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone: &'a str,
    pub subject: &'a str,
    pub message: &'a str,
    pub newsletter: bool,
}

pub fn admin_contact(admin: &str, d: &ContactDetails<'_>) -> OutgoingEmail {
    OutgoingEmail {
        kind: "admin_contact",
        to: admin.to_string(),
        subject: format!("New message: {}", d.subject),
        html_body: format!(
            "<h2>New contact form message</h2>\
             <p><strong>Name:</strong> {} {}</p>\
             <p><strong>Email:</strong> {}</p>\
             <p><strong>Phone:</strong> {}</p>\
             <p><strong>Subject:</strong> {}</p>\
             <p><strong>Message:</strong></p>\
             <p>{}</p>\
             <p><strong>Newsletter:</strong> {}</p>",
            escape(d.first_name),
            escape(d.last_name),
            escape(d.email),
            or_unspecified(d.phone),
            escape(d.subject),
            escape(d.message),
            yes_no(d.newsletter),
        ),
    }
}

pub fn verification_code(to: &str, code: &str) -> OutgoingEmail {
    OutgoingEmail {
        kind: "verification_code",
        to: to.to_string(),
        subject: "Verification code - programming course".into(),
        html_body: format!(
            "<h2>Verification code</h2>\
             <p>Your verification code is:</p>\
             <h1 style=\"letter-spacing: 5px;\">{}</h1>\
             <p>This code is valid for 10 minutes.</p>\
             <p>If you did not request it, ignore this message.</p>",
            escape(code)
        ),
    }
}

pub fn password_reset(to: &str, first_name: &str) -> OutgoingEmail {
    OutgoingEmail {
        kind: "password_reset",
        to: to.to_string(),
        subject: "Password reset - programming course".into(),
        html_body: format!(
            "<h2>Password reset</h2>\
             <p>Hello {},</p>\
             <p>A password reset was requested for your programming course account.</p>\
             <p>If you did not request it, ignore this message.</p>",
            escape(first_name)
        ),
    }
}

pub fn admin_password_reset(
    admin: &str,
    first_name: &str,
    last_name: &str,
    email: &str,
    at: OffsetDateTime,
) -> OutgoingEmail {
    let when = at.format(&Rfc3339).unwrap_or_else(|_| at.to_string());
    OutgoingEmail {
        kind: "admin_password_reset",
        to: admin.to_string(),
        subject: "Password reset request - programming course".into(),
        html_body: format!(
            "<h2>Password reset request</h2>\
             <p><strong>User:</strong> {} {}</p>\
             <p><strong>Email:</strong> {}</p>\
             <p><strong>Time:</strong> {}</p>",
            escape(first_name),
            escape(last_name),
            escape(email),
            when,
        ),
    }
}
