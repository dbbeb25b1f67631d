//! Unit tests for the email notifier, using a recording transport

use quadlet_backup::config::EmailSettings;
use quadlet_backup::managers::notification::{Notifier, NotifyStatus};
use quadlet_backup::utils::mail::NotifyError;
use test_utils::{ConfigBuilder, MockTransport, TestContext};

fn defaults() -> EmailSettings {
    EmailSettings {
        host: "smtp.example.com".to_string(),
        from: "qh@example.com".to_string(),
        to: "root@example.com".to_string(),
        ..Default::default()
    }
}

fn notifier(transport: &MockTransport) -> Notifier {
    Notifier::new(defaults(), Box::new(transport.clone()))
}

#[test]
fn test_disabled_sends_nothing() {
    let transport = MockTransport::new();
    let config = ConfigBuilder::rsync("docs").build();

    for status in [NotifyStatus::Success, NotifyStatus::Failure] {
        assert!(!notifier(&transport).send_notification(&config, status, "x").unwrap());
    }
    assert_eq!(transport.send_count(), 0);
}

#[test]
fn test_success_requires_on_success() {
    let transport = MockTransport::new();
    let config = ConfigBuilder::rsync("docs").notify_failures("").build();

    let sent = notifier(&transport)
        .send_notification(&config, NotifyStatus::Success, "done")
        .unwrap();
    assert!(!sent);
    assert_eq!(transport.send_count(), 0);
}

#[test]
fn test_failure_requires_on_failure() {
    let transport = MockTransport::new();
    let config = ConfigBuilder::rsync("docs").notify_success().build();

    assert!(!notifier(&transport)
        .send_notification(&config, NotifyStatus::Failure, "boom")
        .unwrap());
    assert!(notifier(&transport)
        .send_notification(&config, NotifyStatus::Success, "done")
        .unwrap());

    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.subject, "Backup SUCCESS: docs");
    assert_eq!(sent[0].1.to, "root@example.com");
}

#[test]
fn test_report_contents() {
    let transport = MockTransport::new();
    let config = ConfigBuilder::rclone("photos")
        .sources(&["/srv/photos", "/srv/videos"])
        .schedule("weekly sun 03:00")
        .notify_failures("photos@example.com")
        .build();

    notifier(&transport)
        .send_notification(&config, NotifyStatus::Failure, "rclone sync of /srv/videos failed")
        .unwrap();

    let (server, mail) = transport.sent().remove(0);
    assert_eq!(server.host, "smtp.example.com");
    assert_eq!(server.port, 587);
    assert!(server.tls);
    assert_eq!(mail.from, "qh@example.com");
    assert_eq!(mail.to, "photos@example.com");

    for body in [&mail.text, &mail.html] {
        assert!(body.contains("photos"));
        assert!(body.contains("rclone"));
        assert!(body.contains("/srv/videos"));
        assert!(body.contains("gdrive:backups"));
        assert!(body.contains("weekly sun 03:00"));
        assert!(body.contains("rclone sync of /srv/videos failed"));
        assert!(body.contains("automated message from quadlet-helper"));
    }
}

#[test]
fn test_smtp_override_and_password_file() {
    let ctx = TestContext::new();
    let password_file = ctx.create_file("smtp-password", "hunter2\n");

    let mut config = ConfigBuilder::restic("volumes")
        .notify_failures("")
        .smtp("mail.internal", 465)
        .build();
    if let Some(ref mut smtp) = config.notifications.email.smtp {
        smtp.username = "backup".to_string();
        smtp.password_file = Some(password_file);
        smtp.tls = Some(false);
    }

    let transport = MockTransport::new();
    notifier(&transport)
        .send_notification(&config, NotifyStatus::Failure, "")
        .unwrap();

    let (server, _) = transport.sent().remove(0);
    assert_eq!(server.host, "mail.internal");
    assert_eq!(server.port, 465);
    assert_eq!(server.username, "backup");
    assert_eq!(server.password, "hunter2");
    assert!(!server.tls);
}

#[test]
fn test_missing_recipient() {
    let transport = MockTransport::new();
    let notifier = Notifier::new(
        EmailSettings {
            to: String::new(),
            ..defaults()
        },
        Box::new(transport.clone()),
    );
    let config = ConfigBuilder::rsync("docs").notify_failures("").build();

    assert!(matches!(
        notifier.send_notification(&config, NotifyStatus::Failure, ""),
        Err(NotifyError::MissingRecipient)
    ));
    assert_eq!(transport.send_count(), 0);
}

#[test]
fn test_test_email_ignores_flags() {
    let transport = MockTransport::new();
    let config = ConfigBuilder::rsync("docs").build();

    notifier(&transport).send_test(&config).unwrap();

    let (_, mail) = transport.sent().remove(0);
    assert_eq!(mail.subject, "Test Email from quadlet-helper: docs");
    assert!(mail.text.contains("This is a test email"));
}

#[test]
fn test_status_parsing() {
    assert_eq!("success".parse::<NotifyStatus>().unwrap(), NotifyStatus::Success);
    assert_eq!("FAILURE".parse::<NotifyStatus>().unwrap(), NotifyStatus::Failure);
    assert!("test".parse::<NotifyStatus>().is_err());
}
