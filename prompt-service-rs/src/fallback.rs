//! Local fallback prompt generator
//!
//! Used when the upstream cannot produce a prompt. The request is classified by
//! keyword into a topic and dropped verbatim into that topic's template, so the
//! caller still gets a structured prompt back.

use std::collections::HashSet;

/// Topic of a request, checked in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Health,
    Marketing,
    Coding,
    Study,
    General,
}

const HEALTH_KEYWORDS: &[&str] = &[
    "dieta", "dimagrire", "peso", "salute", "allenamento", "palestra", "nutrizione", "calorie",
    "alimentazione", "benessere", "sonno", "diet", "weight", "health", "fitness", "workout",
    "nutrition",
];

const MARKETING_KEYWORDS: &[&str] = &[
    "marketing", "post", "instagram", "facebook", "linkedin", "tiktok", "social", "campagna",
    "pubblicità", "brand", "lancio", "newsletter", "clienti", "vendite", "seo", "campaign", "ads",
    "launch",
];

const CODING_KEYWORDS: &[&str] = &[
    "codice", "programma", "funzione", "bug", "errore", "script", "python", "javascript",
    "typescript", "rust", "java", "sql", "api", "database", "app", "sviluppo", "code", "function",
    "debug",
];

const STUDY_KEYWORDS: &[&str] = &[
    "studiare", "studio", "esame", "esami", "università", "scuola", "riassunto", "tesi", "lezione",
    "ripasso", "compito", "study", "exam", "essay", "homework", "summary",
];

const TOPICS: [(Topic, &[&str]); 4] = [
    (Topic::Health, HEALTH_KEYWORDS),
    (Topic::Marketing, MARKETING_KEYWORDS),
    (Topic::Coding, CODING_KEYWORDS),
    (Topic::Study, STUDY_KEYWORDS),
];

/// Lower-case and collapse every whitespace run into one space
fn normalize_for_matching(prompt: &str) -> String {
    prompt
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// First topic with a whole-word keyword match, otherwise `General`
pub fn classify_topic(prompt: &str) -> Topic {
    let normalized = normalize_for_matching(prompt);
    let words: HashSet<&str> = normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();

    TOPICS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| words.contains(keyword)))
        .map(|(topic, _)| *topic)
        .unwrap_or(Topic::General)
}

/// Build a structured prompt without calling the upstream
pub fn build_local_fallback_prompt(prompt: &str) -> String {
    let request = prompt.trim();

    match classify_topic(request) {
        Topic::Health => format!(
            "Ruolo: agisci come nutrizionista e personal trainer esperto.\n\n\
Obiettivo: creare un piano pratico, sicuro e sostenibile.\n\n\
Richiesta dell'utente:\n\"{request}\"\n\n\
Vincoli:\n\
- Chiedi età, peso, altezza, livello di attività e condizioni di salute se mancano.\n\
- Evita indicazioni estreme e ricorda di consultare un medico per casi particolari.\n\
- Usa un linguaggio semplice.\n\n\
Formato della risposta:\n\
1. Domande preliminari\n\
2. Piano settimanale\n\
3. Consigli pratici\n\
4. Errori da evitare"
        ),
        Topic::Marketing => format!(
            "Ruolo: agisci come social media manager e copywriter esperto.\n\n\
Obiettivo: produrre contenuti efficaci per il pubblico e il canale indicati.\n\n\
Richiesta dell'utente:\n\"{request}\"\n\n\
Vincoli:\n\
- Definisci pubblico target, tono di voce e obiettivo del contenuto.\n\
- Adatta lunghezza e stile alla piattaforma.\n\
- Includi una call to action chiara.\n\n\
Formato della risposta:\n\
1. Pubblico e obiettivo\n\
2. Tre varianti del testo\n\
3. Hashtag o parole chiave suggerite\n\
4. Consigli per la pubblicazione"
        ),
        Topic::Coding => format!(
            "Ruolo: agisci come sviluppatore software senior.\n\n\
Obiettivo: risolvere il problema tecnico con codice corretto e spiegato.\n\n\
Richiesta dell'utente:\n\"{request}\"\n\n\
Vincoli:\n\
- Chiedi linguaggio, versione e contesto se non sono indicati.\n\
- Scrivi codice completo e commentato solo dove serve.\n\
- Segnala casi limite e possibili errori.\n\n\
Formato della risposta:\n\
1. Analisi del problema\n\
2. Soluzione con codice\n\
3. Spiegazione passo passo\n\
4. Test suggeriti"
        ),
        Topic::Study => format!(
            "Ruolo: agisci come tutor esperto e paziente.\n\n\
Obiettivo: aiutare a capire e memorizzare l'argomento in modo efficace.\n\n\
Richiesta dell'utente:\n\"{request}\"\n\n\
Vincoli:\n\
- Adatta il livello di dettaglio al tipo di scuola o esame.\n\
- Usa esempi concreti.\n\
- Proponi domande di verifica.\n\n\
Formato della risposta:\n\
1. Concetti chiave\n\
2. Spiegazione strutturata\n\
3. Esempi\n\
4. Domande di ripasso"
        ),
        Topic::General => format!(
            "Ruolo: agisci come esperto del settore a cui si riferisce la richiesta.\n\n\
Obiettivo: fornire una risposta completa, precisa e subito utilizzabile.\n\n\
Richiesta dell'utente:\n\"{request}\"\n\n\
Vincoli:\n\
- Se mancano informazioni importanti, elencale prima di rispondere.\n\
- Sii concreto ed evita frasi generiche.\n\n\
Formato della risposta:\n\
1. Domande di chiarimento\n\
2. Risposta strutturata per punti\n\
3. Prossimi passi consigliati"
        ),
    }
}
