//! Checkout form fields and the pre-payment validation pass

use validator::Validate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormField {
    OrdererName,
    OrdererAddress,
    OrdererPhone,
    OrdererEmail,
    ReceiverName,
    ReceiverAddress,
    ReceiverPhone,
    Consent,
}

impl FormField {
    /// Required text fields in the order they are checked.
    pub const REQUIRED: [FormField; 7] = [
        Self::OrdererName,
        Self::OrdererAddress,
        Self::OrdererPhone,
        Self::OrdererEmail,
        Self::ReceiverName,
        Self::ReceiverAddress,
        Self::ReceiverPhone,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::OrdererName => "orderer_name",
            Self::OrdererAddress => "orderer_address",
            Self::OrdererPhone => "orderer_phone",
            Self::OrdererEmail => "orderer_email",
            Self::ReceiverName => "receiver_name",
            Self::ReceiverAddress => "receiver_address",
            Self::ReceiverPhone => "receiver_phone",
            Self::Consent => "agreed",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OrdererName => "Orderer name",
            Self::OrdererAddress => "Address",
            Self::OrdererPhone => "Mobile number (orderer)",
            Self::OrdererEmail => "Email",
            Self::ReceiverName => "Recipient name",
            Self::ReceiverAddress => "Delivery address",
            Self::ReceiverPhone => "Mobile number (recipient)",
            Self::Consent => "Purchase agreement",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Consent => "Please agree to the purchase terms.".to_string(),
            field => format!("{} is required.", field.label()),
        }
    }
}

#[derive(Clone, Debug, Default, Validate)]
pub struct CheckoutForm {
    #[validate(length(min = 1))]
    pub orderer_name: String,
    #[validate(length(min = 1))]
    pub orderer_address: String,
    pub orderer_detail_address: String,
    #[validate(length(min = 1))]
    pub orderer_phone: String,
    #[validate(length(min = 1))]
    pub orderer_email: String,
    #[validate(length(min = 1))]
    pub receiver_name: String,
    #[validate(length(min = 1))]
    pub receiver_address: String,
    pub receiver_detail_address: String,
    #[validate(length(min = 1))]
    pub receiver_phone: String,
    pub agreed: bool,
}

impl CheckoutForm {
    /// "Same as orderer" delivery option.
    pub fn copy_orderer_to_receiver(&mut self) {
        self.receiver_name = self.orderer_name.clone();
        self.receiver_address = self.orderer_address.clone();
        self.receiver_detail_address = self.orderer_detail_address.clone();
        self.receiver_phone = self.orderer_phone.clone();
    }

    fn trimmed(&self) -> Self {
        let t = |s: &String| s.trim().to_string();
        Self {
            orderer_name: t(&self.orderer_name),
            orderer_address: t(&self.orderer_address),
            orderer_detail_address: t(&self.orderer_detail_address),
            orderer_phone: t(&self.orderer_phone),
            orderer_email: t(&self.orderer_email),
            receiver_name: t(&self.receiver_name),
            receiver_address: t(&self.receiver_address),
            receiver_detail_address: t(&self.receiver_detail_address),
            receiver_phone: t(&self.receiver_phone),
            agreed: self.agreed,
        }
    }

    /// First offending field in display order, whitespace-only counting as empty.
    pub fn check(&self) -> Result<(), FormField> {
        if let Err(errors) = self.trimmed().validate() {
            let failed = errors.field_errors();
            if let Some(field) = FormField::REQUIRED.into_iter().find(|f| failed.contains_key(f.name())) {
                return Err(field);
            }
        }
        if !self.agreed {
            return Err(FormField::Consent);
        }
        Ok(())
    }
}
