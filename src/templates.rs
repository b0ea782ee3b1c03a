use handlebars::Handlebars;
use std::sync::Arc;

pub type Hbs = Arc<Handlebars<'static>>;

pub const ALERT_FIRED: &str = "email/alert_fired";

const ALERT_FIRED_HBS: &str = r#"<div style="font-family: sans-serif">
  <p>Hi {{name}},</p>
  <p>Your <strong>{{alert_class}}</strong> alert on <strong>{{symbol}}</strong> was triggered.</p>
  <table>
    {{#if has_condition}}
    <tr><td>Condition</td><td>{{condition}} {{threshold}}</td></tr>
    {{/if}}
    {{#if observed}}
    <tr><td>Observed</td><td>{{observed}}</td></tr>
    {{/if}}
    <tr><td>Snooze</td><td>{{snooze}}</td></tr>
    <tr><td>Fired</td><td>{{fired_at}} ({{repeat}})</td></tr>
  </table>
  {{#if message}}
  <p>{{message}}</p>
  {{/if}}
</div>
"#;

pub fn build_handlebars() -> Hbs {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(false);

    // Built-in template, compiled into the binary.
    if let Err(e) = hb.register_template_string(ALERT_FIRED, ALERT_FIRED_HBS) {
        tracing::error!(error = %e, "alert email template failed to compile");
    }

    Arc::new(hb)
}
