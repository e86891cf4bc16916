use crate::database::{Database, StorageError};

/// Compiled-in texts for every recognized section. A recognized key always
/// resolves to some text even on a brand-new install.
pub const CONTENT_DEFAULTS: &[(&str, &str)] = &[
    (
        "about",
        "🎓 Студия иностранных языков «Лингва»\n\n\
         Индивидуальные и групповые занятия английским, немецким и испанским.\n\
         Первый урок — пробный, проходит онлайн или в студии.",
    ),
    (
        "teachers",
        "👩‍🏫 Наши преподаватели:\n\n\
         • Анна — английский, подготовка к IELTS\n\
         • Мария — немецкий, разговорная практика\n\
         • Диего — испанский, носитель языка",
    ),
    (
        "schedule",
        "📅 Расписание студии:\n\n\
         Пн–Пт: 10:00–20:00\n\
         Сб: 10:00–16:00\n\
         Вс: выходной",
    ),
    (
        "contacts",
        "📞 Контакты:\n\n\
         Телефон: +7 999 000-11-22\n\
         Адрес: ул. Примерная, 5\n\
         Пишите прямо в этот чат — мы ответим!",
    ),
];

/// Read-through/write-through view of the store's content table. Every call
/// round-trips to the store; content changes are rare and consistency across
/// restarts matters more than latency.
#[derive(Clone)]
pub struct ContentRegistry {
    db: Database,
}

impl ContentRegistry {
    /// Seeds missing sections with their defaults (write-if-absent).
    pub async fn new(db: Database) -> Result<Self, StorageError> {
        for (key, value) in CONTENT_DEFAULTS {
            db.seed_content(key, value).await?;
        }
        Ok(Self { db })
    }

    /// Stored value, else the compiled default, else an empty string.
    pub async fn get(&self, key: &str) -> Result<String, StorageError> {
        let default = CONTENT_DEFAULTS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .unwrap_or("");
        self.db.get_content(key, default).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.db.set_content(key, value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn registry() -> (TempDir, ContentRegistry) {
        let dir = TempDir::new().unwrap();
        let db = Database::new(&dir.path().join("studio.db")).await.unwrap();
        db.init().await.unwrap();
        let registry = ContentRegistry::new(db).await.unwrap();
        (dir, registry)
    }

    #[tokio::test]
    async fn never_set_key_returns_its_default() {
        let (_dir, registry) = registry().await;
        let about = registry.get("about").await.unwrap();
        assert!(about.contains("Лингва"));
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let (_dir, registry) = registry().await;
        registry.set("schedule", "новое расписание").await.unwrap();
        assert_eq!(registry.get("schedule").await.unwrap(), "новое расписание");
    }

    #[tokio::test]
    async fn unrecognized_key_is_empty_not_an_error() {
        let (_dir, registry) = registry().await;
        assert_eq!(registry.get("missing-section").await.unwrap(), "");
    }

    #[tokio::test]
    async fn reseeding_keeps_edits() {
        let (_dir, registry) = registry().await;
        registry.set("about", "отредактировано").await.unwrap();

        let again = ContentRegistry::new(registry.db.clone()).await.unwrap();
        assert_eq!(again.get("about").await.unwrap(), "отредактировано");
    }
}
