// src/services/route.rs

use url::Url;

use crate::{common::error::AppError, models::order::Client};

const MAPS_DIRECTIONS_URL: &str = "https://www.google.com/maps/dir/";

/// Link de rota até o endereço do cliente. Rua, número e cidade são obrigatórios.
pub fn build_route_url(client: &Client) -> Result<Url, AppError> {
    let required = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);

    let (Some(street), Some(number), Some(city)) = (
        required(&client.street),
        required(&client.number),
        required(&client.city),
    ) else {
        return Err(AppError::IncompleteAddress);
    };

    let mut parts = vec![format!("{}, {}", street, number)];
    parts.extend(required(&client.neighborhood));
    parts.push(match required(&client.state) {
        Some(state) => format!("{} - {}", city, state),
        None => city,
    });
    parts.extend(required(&client.postal_code));
    parts.push("Brasil".to_string());

    let destination = parts.join(", ");
    Url::parse_with_params(MAPS_DIRECTIONS_URL, &[("api", "1"), ("destination", destination.as_str())])
        .map_err(|e| AppError::InternalServerError(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client {
            name: "Maria Silva".into(),
            street: Some("Av. Paulista".into()),
            number: Some("1000".into()),
            city: Some("São Paulo".into()),
            state: Some("SP".into()),
            ..Client::default()
        }
    }

    #[test]
    fn builds_directions_link() {
        let url = build_route_url(&client()).unwrap();
        let destination = url
            .query_pairs()
            .find(|(k, _)| k == "destination")
            .map(|(_, v)| v.into_owned());

        assert_eq!(url.host_str(), Some("www.google.com"));
        assert_eq!(destination.as_deref(), Some("Av. Paulista, 1000, São Paulo - SP, Brasil"));
    }

    #[test]
    fn optional_parts_are_appended() {
        let mut c = client();
        c.neighborhood = Some("Bela Vista".into());
        c.postal_code = Some("01310-100".into());
        let url = build_route_url(&c).unwrap().to_string();
        assert!(url.contains("Bela+Vista"));
        assert!(url.contains("01310-100"));
    }

    #[test]
    fn incomplete_address_is_rejected() {
        for strip in 0..3 {
            let mut c = client();
            match strip {
                0 => c.street = None,
                1 => c.number = Some("  ".into()),
                _ => c.city = None,
            }
            assert!(matches!(build_route_url(&c), Err(AppError::IncompleteAddress)));
        }
    }
}
