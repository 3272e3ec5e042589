//! E-mail templates.

use crate::notify::Notification;
use crate::types::{Booking, BookingType, Event, UserSummary};
use std::fmt::Write as _;

/// "Complete your payment": sent when a regular booking is created
#[must_use]
pub fn payment_pending(user: &UserSummary, event: &Event, booking: &Booking) -> Notification {
    let mut body = greeting(&user.name);
    body.push_str("<p>Your booking has been created and is waiting for payment.</p>");
    body.push_str(&event_block(event, booking));
    if let Some(deadline) = booking.expires_at {
        let _ = write!(
            body,
            "<p>Please complete your payment before {} UTC or the booking will be released.</p>",
            deadline.format("%Y-%m-%d %H:%M")
        );
    }
    Notification {
        recipient: user.email.clone(),
        subject: format!("Complete your booking for {}", event.title),
        html_body: wrap(&body),
    }
}

/// "Booking confirmed": sent once a payment is reconciled
#[must_use]
pub fn booking_confirmed(user: &UserSummary, event: &Event, booking: &Booking) -> Notification {
    let mut body = greeting(&user.name);
    body.push_str("<p>Your payment was received and your booking is confirmed.</p>");
    body.push_str(&event_block(event, booking));
    if let Some(reference) = &booking.payment_reference {
        let _ = write!(body, "<p>Payment reference: {}</p>", escape(reference));
    }
    body.push_str("<p>See you there!</p>");
    Notification {
        recipient: user.email.clone(),
        subject: format!("Booking confirmed: {}", event.title),
        html_body: wrap(&body),
    }
}

/// Complimentary or VIP tickets granted by an administrator
#[must_use]
pub fn complimentary_granted(user: &UserSummary, event: &Event, booking: &Booking) -> Notification {
    let kind = match booking.booking_type {
        BookingType::Vip => "VIP",
        BookingType::Complimentary | BookingType::Regular => "complimentary",
    };
    let mut body = greeting(&user.name);
    let _ = write!(body, "<p>You have been granted {kind} tickets. No payment is required.</p>");
    body.push_str(&event_block(event, booking));
    Notification {
        recipient: user.email.clone(),
        subject: format!("Your {kind} tickets for {}", event.title),
        html_body: wrap(&body),
    }
}

/// Reminder ahead of the event
#[must_use]
pub fn event_reminder(user: &UserSummary, event: &Event, booking: &Booking) -> Notification {
    let mut body = greeting(&user.name);
    body.push_str("<p>This is a reminder about your upcoming event.</p>");
    body.push_str(&event_block(event, booking));
    body.push_str("<p>Please arrive early and bring this e-mail with you.</p>");
    Notification {
        recipient: user.email.clone(),
        subject: format!("Reminder: {} is coming up", event.title),
        html_body: wrap(&body),
    }
}

/// Announcement of a newly published event
#[must_use]
pub fn new_event(user: &UserSummary, event: &Event) -> Notification {
    let mut body = greeting(&user.name);
    body.push_str("<p>A new event has just been announced.</p>");
    let _ = write!(
        body,
        "<h2>{}</h2><p>{}</p><ul><li>Date: {}</li><li>Time: {}</li><li>Venue: {}, {}</li><li>Price: {}</li></ul>",
        escape(&event.title),
        escape(&event.description),
        event.date.format("%A, %B %-d, %Y"),
        escape(&event.time),
        escape(&event.venue),
        escape(&event.location),
        event.price,
    );
    Notification {
        recipient: user.email.clone(),
        subject: format!("New event: {}", event.title),
        html_body: wrap(&body),
    }
}

fn greeting(name: &str) -> String {
    format!("<p>Hello {},</p>", escape(name))
}

fn event_block(event: &Event, booking: &Booking) -> String {
    format!(
        "<h2>{}</h2><ul><li>Date: {}</li><li>Time: {}</li><li>Venue: {}, {}</li><li>Tickets: {}</li><li>Amount: {}</li></ul>",
        escape(&event.title),
        event.date.format("%A, %B %-d, %Y"),
        escape(&event.time),
        escape(&event.venue),
        escape(&event.location),
        booking.tickets,
        booking.total_amount,
    )
}

fn wrap(body: &str) -> String {
    format!("<div style=\"font-family: sans-serif; max-width: 600px\">{body}</div>")
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
