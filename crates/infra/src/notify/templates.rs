//! Message templates.

use super::Notification;

pub const WAITLIST_WELCOME_SUBJECT: &str = "Welcome to the BillStack Waitlist!";

const WAITLIST_WELCOME_TEXT: &str = "Hi there,

Thanks for raising your hand for the BillStack waitlist. We're excited to help you reclaim your billing workflow.

Here's what you're getting early access to:
- Branded invoice creation with one-click payment links
- Smart reminders that nudge clients automatically
- Expense tracking that ties every rupee and dollar back to clients
- Real-time profitability reports so you can see what's working

We'll be in touch soon with early access perks, onboarding, and partner offers designed just for waitlisters.

Talk soon,
Team BillStack";

const WAITLIST_WELCOME_HTML: &str = r#"<!DOCTYPE html>
<html>
  <body style="font-family: Arial, sans-serif; color: #1f2933; line-height: 1.5;">
    <h2>Welcome to the BillStack waitlist!</h2>
    <p>Thanks for raising your hand. We're excited to help you reclaim your billing workflow.</p>
    <p>Here's what you're getting early access to:</p>
    <ul>
      <li>Branded invoice creation with one-click payment links</li>
      <li>Smart reminders that nudge clients automatically</li>
      <li>Expense tracking that ties every rupee and dollar back to clients</li>
      <li>Real-time profitability reports so you can see what's working</li>
    </ul>
    <p>We'll be in touch soon with early access perks, onboarding, and partner offers.</p>
    <p>Talk soon,<br/>Team BillStack</p>
  </body>
</html>"#;

pub fn waitlist_welcome(email: &str) -> Notification {
    Notification {
        to: email.to_string(),
        subject: WAITLIST_WELCOME_SUBJECT.to_string(),
        text_body: WAITLIST_WELCOME_TEXT.to_string(),
        html_body: Some(WAITLIST_WELCOME_HTML.to_string()),
    }
}
