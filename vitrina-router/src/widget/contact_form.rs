use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::FutureExt;
use futures::future::{self, LocalBoxFuture};
use tracing::{debug, error, info};
use url::{Url, form_urlencoded};
use vitrina_core::site::ContactFormSpec;
use vitrina_core::validate;

use super::{Widget, WidgetContext};
use crate::dom::{Document, NodeId};
use crate::error::WidgetError;
use crate::i18n::Lookup;
use crate::page::{EventKind, ListenTarget, ListenerId};

/// Named values of a submitted contact form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactMessage {
    pub fn body(&self) -> String {
        format!(
            "Nombre: {}\nEmail: {}\n\nMensaje:\n{}",
            self.name, self.email, self.message
        )
    }

    /// `mailto:` link carrying the subject and body, percent-encoded.
    pub fn mailto(&self, recipient: &str) -> Result<String, WidgetError> {
        let mut url = Url::parse(&format!("mailto:{recipient}"))?;
        let query = format!(
            "subject={}&body={}",
            encode(&self.subject),
            encode(&self.body())
        );
        url.set_query(Some(&query));
        Ok(url.into())
    }
}

/// Mail clients read `+` literally, so spaces go out as `%20`.
fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn fields(doc: &Document, form: NodeId) -> Vec<(NodeId, String)> {
    doc.query_all(form, |el| {
        matches!(el.tag(), "input" | "textarea" | "select") && el.has_attr("name")
    })
    .into_iter()
    .filter_map(|node| Some((node, doc.attr(node, "name")?.to_string())))
    .collect()
}

fn value_of(doc: &Document, field: NodeId) -> String {
    match doc.tag(field) {
        Some("textarea") => doc.text_content(field),
        _ => doc.attr(field, "value").unwrap_or_default().to_string(),
    }
}

/// Contact form with no backend: submitting hands a prefilled message to the
/// mail client and clears the fields.
pub struct ContactForm {
    spec: ContactFormSpec,
    ctx: WidgetContext,
    state: RefCell<Option<(NodeId, ListenerId)>>,
    me: Weak<ContactForm>,
}

impl ContactForm {
    pub fn new(spec: ContactFormSpec, ctx: WidgetContext) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            spec,
            ctx,
            state: RefCell::new(None),
            me: me.clone(),
        })
    }

    fn form(&self) -> Option<NodeId> {
        self.state.borrow().map(|(form, _)| form)
    }

    fn setup(&self) {
        if self.form().is_some() {
            return;
        }
        let Some(form) = self.ctx.page.document().element_by_id(&self.spec.form_id) else {
            debug!("No contact form {} in this view", self.spec.form_id);
            return;
        };
        let me = self.me.clone();
        let listener = self.ctx.page.listen(ListenTarget::Node(form), EventKind::Submit, move |_| {
            if let Some(contact) = me.upgrade() {
                contact.submit();
            }
        });
        *self.state.borrow_mut() = Some((form, listener));
        info!("Contact form {} ready", self.spec.form_id);
    }

    /// Current field values.
    pub fn message(&self) -> Option<ContactMessage> {
        let form = self.form()?;
        let doc = self.ctx.page.document();
        let mut message = ContactMessage::default();
        for (field, name) in fields(&doc, form) {
            let slot = match name.as_str() {
                "name" => &mut message.name,
                "email" => &mut message.email,
                "subject" => &mut message.subject,
                "message" => &mut message.message,
                _ => continue,
            };
            *slot = value_of(&doc, field);
        }
        Some(message)
    }

    pub fn submit(&self) {
        let Some(message) = self.message() else { return };
        let raw = self
            .ctx
            .locale
            .lookup(&self.spec.email_key)
            .into_text()
            .unwrap_or_default();
        let recipient = validate::config_value(&self.spec.email_key, &raw);
        match message.mailto(recipient) {
            Ok(link) => {
                info!("Contact form submitted by {}", message.email);
                self.ctx.page.assign(&link);
                self.reset();
            }
            Err(e) => error!("Could not build contact link: {}", e),
        }
    }

    fn reset(&self) {
        let Some(form) = self.form() else { return };
        let mut doc = self.ctx.page.document_mut();
        for (field, _) in fields(&doc, form) {
            if doc.tag(field) == Some("textarea") {
                doc.set_text_content(field, "");
            } else {
                doc.remove_attr(field, "value");
            }
        }
    }
}

impl Widget for ContactForm {
    fn name(&self) -> &str {
        &self.spec.form_id
    }

    fn init(&self) -> LocalBoxFuture<'_, Result<(), WidgetError>> {
        self.setup();
        future::ready(Ok(())).boxed_local()
    }

    fn activate(&self, _target: Option<&str>) {
        self.submit();
    }

    fn close(&self) {
        self.reset();
    }

    fn destroy(&self) {
        if let Some((_, listener)) = self.state.borrow_mut().take() {
            self.ctx.page.unlisten(listener);
        }
    }
}
