use crate::models::{Order, OrderStatus};
use sagfo_shared::Masked;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

/// A drafted message for the customer's messaging channel.
///
/// Sending it is best effort; nothing in the order lifecycle waits on it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CustomerMessage {
    pub order_id: Uuid,
    pub recipient_name: String,
    pub phone: Masked<String>,
    pub body: String,
    /// Click-to-chat link with the body prefilled, when the phone has digits.
    pub compose_url: Option<String>,
}

impl CustomerMessage {
    fn new(order: &Order, body: String) -> Self {
        let phone = order.customer_info.phone.expose();
        Self {
            order_id: order.id,
            recipient_name: order.customer_info.name.clone(),
            phone: order.customer_info.phone.clone(),
            compose_url: whatsapp_link(phone, &body).map(String::from),
            body,
        }
    }
}

fn greeting_name(order: &Order) -> &str {
    let name = order.customer_info.name.trim();
    if name.is_empty() {
        "Cliente"
    } else {
        name
    }
}

/// Message sent when an order enters `status`, if that status warrants one.
pub fn message_for(order: &Order, status: OrderStatus) -> Option<CustomerMessage> {
    let name = greeting_name(order);
    let reference = order.short_ref();
    let body = match status {
        OrderStatus::Received => format!(
            "¡Hola {name}! Confirmamos el recibo de tu pago para el pedido #{reference}. \
             Tu equipo ya está en proceso de gestión."
        ),
        OrderStatus::InTransit => format!(
            "¡Hola {name}! Tu pedido #{reference} ha sido despachado y está en camino. \
             ¡Pronto disfrutarás de tu equipo SAGFO!"
        ),
        _ => return None,
    };
    Some(CustomerMessage::new(order, body))
}

/// Reminder for an outstanding balance. `None` when nothing is owed.
pub fn payment_reminder(order: &Order) -> Option<CustomerMessage> {
    if order.financials.amount_pending <= 0 {
        return None;
    }
    let body = format!(
        "¡Hola {}! Te saludamos de SAGFO Fitness. Recordamos amablemente que tienes un saldo \
         pendiente de ${} del pedido #{}. Quedamos atentos para coordinar el pago final. ¡Gracias!",
        greeting_name(order),
        format_amount(order.financials.amount_pending),
        order.short_ref()
    );
    Some(CustomerMessage::new(order, body))
}

/// `https://wa.me/<digits>?text=<body>`; `None` if the phone has no digits.
pub fn whatsapp_link(phone: &str, text: &str) -> Option<Url> {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    Url::parse_with_params(&format!("https://wa.me/{digits}"), &[("text", text)]).ok()
}

/// Thousands-grouped amount, `1234567` -> `1.234.567`.
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if amount < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// Plain-text summary the back office pastes into chats with the workshop or
/// the transporter.
pub fn order_summary(order: &Order) -> String {
    let info = &order.customer_info;
    let or = |value: &str, fallback: &str| -> String {
        if value.trim().is_empty() {
            fallback.to_string()
        } else {
            value.to_string()
        }
    };

    let mut lines = vec![
        format!("PEDIDO #{}", order.short_ref()),
        format!("Cliente: {}", or(&info.name, "Cliente SAGFO")),
        format!("Tel: {}", or(info.phone.expose(), "Sin teléfono")),
        format!(
            "Ubicación: {}, {} ({})",
            or(&info.city, "Sin ciudad"),
            or(&info.department, "Sin depto"),
            or(&info.country, "Sin país")
        ),
        format!(
            "Dirección: {}",
            or(info.address.as_deref().unwrap_or_default(), "No especificada")
        ),
        String::new(),
        "RESUMEN FINANCIERO".to_string(),
        format!("- Total: ${}", format_amount(order.financials.total_order_value)),
        format!("- Pagado: ${}", format_amount(order.financials.amount_paid)),
        format!("- Pendiente: ${}", format_amount(order.financials.amount_pending)),
        format!("- Método: {}", order.payment_method.label()),
        String::new(),
        "PRODUCTOS".to_string(),
    ];

    for item in &order.items {
        lines.push(format!("- {}x {}", item.quantity, item.equipment.name));
        let c = &item.customization;
        if let Some(v) = &c.structure_color {
            lines.push(format!("  • Estructura: {v}"));
        }
        if let Some(v) = &c.upholstery_color {
            lines.push(format!("  • Tapicería: {v}"));
        }
        if let Some(v) = &c.selected_weight {
            lines.push(format!("  • Peso: {v}"));
        }
    }

    lines.push(String::new());
    lines.push(format!("ESTADO: {}", order.status.label().to_uppercase()));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_order;
    use sagfo_catalog::{AvailabilityStatus, Category, Equipment};

    fn press() -> Equipment {
        Equipment::new("Prensa 45°", Category::Maquinaria, AvailabilityStatus::MadeToOrder, 4_200_000)
    }

    #[test]
    fn test_messages_only_for_received_and_in_transit() {
        let order = sample_order(&[press()]);
        assert!(message_for(&order, OrderStatus::Received).is_some());
        assert!(message_for(&order, OrderStatus::InTransit).is_some());
        assert!(message_for(&order, OrderStatus::Dispatched).is_none());
        assert!(message_for(&order, OrderStatus::Cancelled).is_none());
    }

    #[test]
    fn test_message_mentions_short_reference() {
        let order = sample_order(&[press()]);
        let msg = message_for(&order, OrderStatus::Received).unwrap();
        assert!(msg.body.contains(&order.short_ref()));
        assert!(msg.body.contains("Andrés Pardo"));
        let url = msg.compose_url.unwrap();
        assert!(url.starts_with("https://wa.me/573105550101?text="));
    }

    #[test]
    fn test_whatsapp_link_strips_formatting_and_encodes_text() {
        let url = whatsapp_link("+57 (310) 555-0101", "Hola mundo & más").unwrap();
        assert_eq!(url.host_str(), Some("wa.me"));
        assert_eq!(url.path(), "/573105550101");
        let text: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(text, vec![("text".to_string(), "Hola mundo & más".to_string())]);
        assert!(whatsapp_link("sin número", "x").is_none());
    }

    #[test]
    fn test_payment_reminder_only_when_owing() {
        let owing = sample_order(&[press()]);
        let reminder = payment_reminder(&owing).unwrap();
        assert!(reminder.body.contains("2.100.000"));

        let stock = Equipment::new("Disco", Category::Accesorios, AvailabilityStatus::InStock, 90_000);
        assert!(payment_reminder(&sample_order(&[stock])).is_none());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1_000), "1.000");
        assert_eq!(format_amount(4_200_000), "4.200.000");
        assert_eq!(format_amount(-12_500), "-12.500");
    }

    #[test]
    fn test_order_summary_lists_items_and_totals() {
        let mut order = sample_order(&[press()]);
        order.items[0].customization.upholstery_color = Some("Rojo".to_string());
        let summary = order_summary(&order);

        assert!(summary.starts_with(&format!("PEDIDO #{}", order.short_ref())));
        assert!(summary.contains("- 1x Prensa 45°"));
        assert!(summary.contains("  • Tapicería: Rojo"));
        assert!(summary.contains("- Total: $4.200.000"));
        assert!(summary.contains("- Método: Producción (50/50)"));
        assert!(summary.ends_with("ESTADO: PENDIENTE DE APROBACIÓN"));
    }
}
