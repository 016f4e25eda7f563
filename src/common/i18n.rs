// src/common/i18n.rs

use std::collections::HashMap;

use anyhow::Context;

pub const DEFAULT_LANG: &str = "pt";

const CATALOGS: &[(&str, &str)] = &[
    ("pt", include_str!("../../locales/pt.json")),
    ("en", include_str!("../../locales/en.json")),
];

/// Mensagens de erro traduzidas, carregadas uma vez na inicialização.
#[derive(Debug, Clone)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut catalogs = HashMap::new();
        for (lang, raw) in CATALOGS {
            let messages: HashMap<String, String> = serde_json::from_str(raw)
                .with_context(|| format!("Catálogo de mensagens '{}' inválido", lang))?;
            catalogs.insert(lang.to_string(), messages);
        }
        Ok(Self { catalogs })
    }

    /// Traduz `key` para `lang`, substituindo `{nome}` pelos argumentos.
    /// Cai para o português e, em último caso, devolve a própria chave.
    pub fn translate(&self, lang: &str, key: &str, args: &[(&str, String)]) -> String {
        let template = self
            .catalogs
            .get(lang)
            .and_then(|messages| messages.get(key))
            .or_else(|| self.catalogs.get(DEFAULT_LANG).and_then(|m| m.get(key)))
            .cloned()
            .unwrap_or_else(|| key.to_string());

        args.iter().fold(template, |acc, (name, value)| {
            acc.replace(&format!("{{{}}}", name), value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogs_define_the_same_keys() {
        let store = I18nStore::load().unwrap();
        let pt = &store.catalogs["pt"];
        let en = &store.catalogs["en"];
        for key in pt.keys() {
            assert!(en.contains_key(key), "chave sem tradução em inglês: {}", key);
        }
        assert_eq!(pt.len(), en.len());
    }

    #[test]
    fn placeholders_are_filled() {
        let store = I18nStore::load().unwrap();
        let msg = store.translate(
            "pt",
            "classification.unbalanced",
            &[("classified", "7".into()), ("expected", "10".into())],
        );
        assert_eq!(msg, "Total classificado (7) deve ser igual à quantidade da movimentação (10).");
    }

    #[test]
    fn unknown_language_falls_back_to_portuguese() {
        let store = I18nStore::load().unwrap();
        assert_eq!(store.translate("de", "user.not_found", &[]), "Usuário não encontrado.");
        assert_eq!(store.translate("pt", "nao.existe", &[]), "nao.existe");
    }
}
