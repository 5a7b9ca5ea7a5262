/// Portal entry point and the DOM landmarks the crawl navigates by.
pub const PORTAL_URL: &str = "https://www.alunoonline.uerj.br";

// Login form
pub const LOGIN_ID_SELECTOR: &str = "#matricula";
pub const LOGIN_SECRET_SELECTOR: &str = "#senha";
pub const LOGIN_SUBMIT_SELECTOR: &str = "#confirmar";

// Menu links only appear once the session is authenticated
pub const MENU_LINK_SELECTOR: &str = "a.LINKNAOSUB";
pub const CATALOG_MENU_TEXT: &str = "Disciplinas do Currículo";

pub const CATALOG_LIST_SELECTOR: &str = "tbody";
pub const DETAIL_BLOCK_SELECTOR: &str = ".divContentBlockHeader";

// Detail page headings and phrases
pub const REQUIREMENTS_HEADER: &str = "Requisitos da Disciplina";
pub const NO_REQUIREMENTS_TEXT: &str = "Esta Disciplina não possui requisito para inscrição.";
pub const CLASSES_HEADERS: [&str; 2] = ["Turmas da Disciplina", "Turma da Disciplina"];
pub const DEFAULT_REQUIREMENT_TYPE: &str = "Requirement";

/// Minimum number of cells a catalog row needs to be a discipline row.
pub const MIN_CATALOG_CELLS: usize = 9;

// Document store collections and their identity fields
pub const DISCIPLINES_COLLECTION: &str = "disciplines";
pub const STUDENTS_COLLECTION: &str = "students";
pub const DISCIPLINE_KEY_FIELD: &str = "disciplineId";
pub const STUDENT_KEY_FIELD: &str = "studentId";

// Environment variables
pub const ENV_MATRICULA: &str = "UERJ_MATRICULA";
pub const ENV_SENHA: &str = "UERJ_SENHA";
pub const ENV_CHROMIUM_PATH: &str = "UERJ_CHROMIUM_PATH";
pub const ENV_METRICS_PORT: &str = "UERJ_METRICS_PORT";
